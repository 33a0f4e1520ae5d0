//! Deployment units and their checksummed wire form

use crate::command::Command;
use crate::error::{DeploymentError, Result};
use serde::{Deserialize, Serialize};

/// Ordered commands bringing one zone to a target state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    commands: Vec<Command>,
}

impl DeploymentUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Append another unit's commands after this one's
    pub fn append(&mut self, other: &DeploymentUnit) {
        self.commands.extend(other.commands.iter().cloned());
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn serialize(&self) -> Result<SerializedDeploymentUnit> {
        let bytes = serde_json::to_vec(self)?;
        Ok(SerializedDeploymentUnit {
            checksum: compute_checksum(&bytes),
            bytes,
        })
    }
}

/// A unit as shipped between runtimes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedDeploymentUnit {
    checksum: String,
    bytes: Vec<u8>,
}

impl SerializedDeploymentUnit {
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn verify(&self) -> Result<()> {
        let actual = compute_checksum(&self.bytes);
        if actual != self.checksum {
            return Err(DeploymentError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Verify, then decode
    pub fn deserialize(&self) -> Result<DeploymentUnit> {
        self.verify()?;
        Ok(serde_json::from_slice(&self.bytes)?)
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&mut self) {
        self.bytes.push(b' ');
    }
}

fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"fabric3-deployment-unit-v1:");
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

//! Service contracts

use crate::kinds::ContractKind;
use serde::{Deserialize, Serialize};

/// A single operation on a service contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub input_types: Vec<String>,
    pub output_type: Option<String>,
    pub fault_types: Vec<String>,
    pub one_way: bool,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_types: Vec::new(),
            output_type: None,
            fault_types: Vec::new(),
            one_way: false,
        }
    }

    pub fn with_input(mut self, ty: impl Into<String>) -> Self {
        self.input_types.push(ty.into());
        self
    }

    pub fn with_output(mut self, ty: impl Into<String>) -> Self {
        self.output_type = Some(ty.into());
        self
    }

    pub fn with_fault(mut self, ty: impl Into<String>) -> Self {
        self.fault_types.push(ty.into());
        self
    }

    pub fn one_way(mut self) -> Self {
        self.one_way = true;
        self
    }
}

/// The interface a service exposes or a reference requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContract {
    pub kind: ContractKind,
    pub interface_name: String,
    pub operations: Vec<Operation>,
    /// Contract the client must implement for bidirectional interactions
    pub callback: Option<Box<ServiceContract>>,
    pub remotable: bool,
}

impl ServiceContract {
    pub fn new(kind: ContractKind, interface_name: impl Into<String>) -> Self {
        Self {
            kind,
            interface_name: interface_name.into(),
            operations: Vec::new(),
            callback: None,
            remotable: false,
        }
    }

    pub fn java(interface_name: impl Into<String>) -> Self {
        Self::new(ContractKind::Java, interface_name)
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn with_callback(mut self, callback: ServiceContract) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn remotable(mut self) -> Self {
        self.remotable = true;
        self
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

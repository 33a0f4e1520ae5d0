//! Promotion resolution
//!
//! A composite can expose an inner component's service or reference on its
//! own boundary. The declaration names the inner endpoint by URI, possibly
//! without a fragment when the target component has exactly one candidate.
//! Resolution rewrites every such URI to the fully-qualified
//! `component#endpoint` form, walking the composite tree top-down.

use crate::domain::{ComponentId, LogicalDomain, ReferenceId, ServiceId};
use crate::validation::{ValidationContext, ValidationError};
use fabric_types::Uri;
use tracing::{debug, instrument, trace};

/// Resolves composite-level promotions to concrete inner endpoints
#[derive(Debug, Default, Clone, Copy)]
pub struct PromotionResolver;

impl PromotionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve every promotion declared on `component` and its descendant
    /// composites. Errors are recorded in `context` and resolution continues.
    #[instrument(skip_all, fields(component = %domain.component(component).uri))]
    pub fn resolve(
        &self,
        domain: &mut LogicalDomain,
        component: ComponentId,
        context: &mut ValidationContext,
    ) {
        let mut pending = vec![component];
        while let Some(composite) = pending.pop() {
            if !domain.component(composite).is_composite() {
                continue;
            }

            let services = domain.component(composite).services().to_vec();
            for service in services {
                self.resolve_service(domain, composite, service, context);
            }

            let references = domain.component(composite).references().to_vec();
            for reference in references {
                let current = domain.reference(reference);
                if !current.resolved || current.multiplicity.is_multi_valued() {
                    self.resolve_reference(domain, composite, reference, context);
                }
            }

            pending.extend(domain.component(composite).children().iter().rev().copied());
        }
    }

    fn resolve_service(
        &self,
        domain: &mut LogicalDomain,
        composite: ComponentId,
        service: ServiceId,
        context: &mut ValidationContext,
    ) {
        let Some(promoted) = domain.service(service).promote.clone() else {
            return;
        };
        let promoting = domain.service(service).uri.clone();
        let promoted = absolutize(&domain.component(composite).uri, &promoted);

        let Some(target) = domain.child(composite, &promoted.defragment()) else {
            context.add_error(ValidationError::PromotedComponentNotFound {
                promoting,
                promoted,
            });
            return;
        };

        let fragment = promoted.fragment().map(str::to_string);
        let resolved = match fragment.as_deref() {
            Some(name) => match domain.component_service(target, name) {
                Some(_) => promoted.clone(),
                None => {
                    context.add_error(ValidationError::ServiceNotFound {
                        promoting,
                        promoted,
                    });
                    return;
                }
            },
            None => {
                let candidates: Vec<String> = domain
                    .component(target)
                    .services()
                    .iter()
                    .map(|id| domain.service(*id))
                    .filter(|s| !s.callback)
                    .map(|s| s.name().to_string())
                    .collect();
                match candidates.len() {
                    0 => {
                        context.add_error(ValidationError::NoServiceOnComponent {
                            promoting,
                            promoted,
                        });
                        return;
                    }
                    1 => promoted.with_fragment(&candidates[0]),
                    _ => {
                        context.add_error(ValidationError::AmbiguousService {
                            promoting,
                            promoted,
                            candidates,
                        });
                        return;
                    }
                }
            }
        };

        trace!(service = %promoting, promoted = %resolved, "Resolved service promotion");
        domain.promote_service(service, resolved);
    }

    fn resolve_reference(
        &self,
        domain: &mut LogicalDomain,
        composite: ComponentId,
        reference: ReferenceId,
        context: &mut ValidationContext,
    ) {
        let promoting = domain.reference(reference).uri.clone();
        let composite_uri = domain.component(composite).uri.clone();
        let promoted_uris = domain.reference(reference).promoted_uris.clone();
        if promoted_uris.is_empty() {
            return;
        }

        let mut resolved = Vec::with_capacity(promoted_uris.len());
        let mut failed = false;

        for promoted in promoted_uris {
            let promoted = absolutize(&composite_uri, &promoted);
            let Some(target) = domain.child(composite, &promoted.defragment()) else {
                context.add_error(ValidationError::PromotedComponentNotFound {
                    promoting: promoting.clone(),
                    promoted: promoted.clone(),
                });
                failed = true;
                resolved.push(promoted);
                continue;
            };

            let fragment = promoted.fragment().map(str::to_string);
            match fragment.as_deref() {
                Some(name) => {
                    if domain.component_reference(target, name).is_none() {
                        context.add_error(ValidationError::ReferenceNotFound {
                            promoting: promoting.clone(),
                            promoted: promoted.clone(),
                        });
                        failed = true;
                    }
                    resolved.push(promoted);
                }
                None => {
                    let candidates: Vec<String> = domain
                        .component(target)
                        .references()
                        .iter()
                        .map(|id| domain.reference(*id).name().to_string())
                        .collect();
                    match candidates.len() {
                        1 => resolved.push(promoted.with_fragment(&candidates[0])),
                        0 => {
                            context.add_error(ValidationError::ReferenceNotFound {
                                promoting: promoting.clone(),
                                promoted: promoted.clone(),
                            });
                            failed = true;
                            resolved.push(promoted);
                        }
                        _ => {
                            context.add_error(ValidationError::AmbiguousReference {
                                promoting: promoting.clone(),
                                promoted: promoted.clone(),
                                candidates,
                            });
                            failed = true;
                            resolved.push(promoted);
                        }
                    }
                }
            }
        }

        let entry = domain.reference_mut(reference);
        entry.promoted_uris = resolved;
        entry.resolved = !failed;
        if !failed {
            debug!(reference = %promoting, count = entry.promoted_uris.len(), "Resolved reference promotion");
        }
    }
}

/// Promotion targets may be written relative to the declaring composite
fn absolutize(composite: &Uri, promoted: &Uri) -> Uri {
    if promoted.as_str().contains("://") {
        promoted.clone()
    } else {
        Uri::new(format!("{}/{}", composite.defragment(), promoted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ComponentDefinition;
    use fabric_types::{ImplementationKind, Multiplicity, Operation, ServiceContract};
    use proptest::prelude::*;

    fn contract(name: &str) -> ServiceContract {
        ServiceContract::java(name).with_operation(Operation::new("invoke"))
    }

    /// domain root -> composite -> target (leaf)
    fn fixture() -> (LogicalDomain, ComponentId, ComponentId) {
        let mut domain = LogicalDomain::new("fabric3://domain");
        let composite = domain
            .add_component(domain.root(), "composite", ComponentDefinition::composite("app"))
            .unwrap();
        let target = domain
            .add_component(
                composite,
                "target",
                ComponentDefinition::new(ImplementationKind::Java, "app"),
            )
            .unwrap();
        (domain, composite, target)
    }

    fn promote_service(domain: &mut LogicalDomain, composite: ComponentId, uri: &str) -> ServiceId {
        let service = domain
            .add_service(composite, "promoted", contract("org.acme.Promoted"))
            .unwrap();
        domain.promote_service(service, Uri::new(uri));
        service
    }

    #[test]
    fn test_single_service_resolves_without_fragment() {
        let (mut domain, composite, target) = fixture();
        domain.add_service(target, "A", contract("org.acme.A")).unwrap();
        let service = promote_service(&mut domain, composite, "fabric3://domain/composite/target");

        let mut context = ValidationContext::new();
        let root = domain.root();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        assert!(!context.has_errors());
        assert_eq!(
            domain.service(service).promote.as_ref().map(Uri::as_str),
            Some("fabric3://domain/composite/target#A")
        );
    }

    #[test]
    fn test_two_services_without_fragment_is_ambiguous() {
        let (mut domain, composite, target) = fixture();
        domain.add_service(target, "A", contract("org.acme.A")).unwrap();
        domain.add_service(target, "B", contract("org.acme.B")).unwrap();
        let service = promote_service(&mut domain, composite, "fabric3://domain/composite/target");

        let mut context = ValidationContext::new();
        let root = domain.root();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        assert_eq!(context.errors().len(), 1);
        match &context.errors()[0] {
            ValidationError::AmbiguousService { candidates, .. } => {
                assert_eq!(candidates, &vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            domain.service(service).promote.as_ref().map(Uri::as_str),
            Some("fabric3://domain/composite/target")
        );
    }

    #[test]
    fn test_zero_services_reports_no_service_on_component() {
        let (mut domain, composite, _) = fixture();
        promote_service(&mut domain, composite, "target");

        let mut context = ValidationContext::new();
        let root = domain.root();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        assert!(matches!(
            context.errors(),
            [ValidationError::NoServiceOnComponent { .. }]
        ));
    }

    #[test]
    fn test_named_service_must_exist() {
        let (mut domain, composite, target) = fixture();
        domain.add_service(target, "A", contract("org.acme.A")).unwrap();
        promote_service(&mut domain, composite, "fabric3://domain/composite/target#B");

        let mut context = ValidationContext::new();
        let root = domain.root();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        assert!(matches!(context.errors(), [ValidationError::ServiceNotFound { .. }]));
    }

    #[test]
    fn test_missing_component_is_reported() {
        let (mut domain, composite, _) = fixture();
        promote_service(&mut domain, composite, "fabric3://domain/composite/absent#A");

        let mut context = ValidationContext::new();
        let root = domain.root();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        assert!(matches!(
            context.errors(),
            [ValidationError::PromotedComponentNotFound { .. }]
        ));
    }

    #[test]
    fn test_reference_promotion_fans_out_and_accumulates_errors() {
        let (mut domain, composite, target) = fixture();
        let other = domain
            .add_component(
                composite,
                "other",
                ComponentDefinition::new(ImplementationKind::Java, "app"),
            )
            .unwrap();
        domain
            .add_reference(target, "only", contract("org.acme.A"), Multiplicity::OneOne)
            .unwrap();
        domain
            .add_reference(other, "x", contract("org.acme.A"), Multiplicity::OneOne)
            .unwrap();
        domain
            .add_reference(other, "y", contract("org.acme.A"), Multiplicity::OneOne)
            .unwrap();

        let promoting = domain
            .add_reference(composite, "promoted", contract("org.acme.A"), Multiplicity::OneN)
            .unwrap();
        domain.promote_reference(
            promoting,
            vec![
                Uri::new("fabric3://domain/composite/target"),
                Uri::new("fabric3://domain/composite/other"),
                Uri::new("fabric3://domain/composite/target#missing"),
            ],
        );

        let mut context = ValidationContext::new();
        let root = domain.root();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        assert_eq!(context.errors().len(), 2);
        assert!(matches!(context.errors()[0], ValidationError::AmbiguousReference { .. }));
        assert!(matches!(context.errors()[1], ValidationError::ReferenceNotFound { .. }));

        let reference = domain.reference(promoting);
        assert!(!reference.resolved);
        assert_eq!(reference.promoted_uris[0].as_str(), "fabric3://domain/composite/target#only");
    }

    #[test]
    fn test_reference_without_fragment_needs_a_reference_on_target() {
        let (mut domain, composite, _) = fixture();
        let promoting = domain
            .add_reference(composite, "promoted", contract("org.acme.A"), Multiplicity::OneOne)
            .unwrap();
        domain.promote_reference(promoting, vec![Uri::new("target")]);

        let mut context = ValidationContext::new();
        let root = domain.root();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        match context.errors() {
            [ValidationError::ReferenceNotFound { promoting: uri, promoted }] => {
                assert_eq!(uri.as_str(), "fabric3://domain/composite#promoted");
                assert_eq!(promoted.as_str(), "fabric3://domain/composite/target");
            }
            other => panic!("unexpected errors: {other:?}"),
        }
        assert!(!domain.reference(promoting).resolved);
    }

    #[test]
    fn test_resolved_multi_valued_reference_is_revisited() {
        let (mut domain, composite, target) = fixture();
        domain
            .add_reference(target, "only", contract("org.acme.A"), Multiplicity::OneOne)
            .unwrap();
        let single = domain
            .add_reference(composite, "single", contract("org.acme.A"), Multiplicity::OneOne)
            .unwrap();
        let many = domain
            .add_reference(composite, "many", contract("org.acme.A"), Multiplicity::ZeroN)
            .unwrap();
        domain.promote_reference(single, vec![Uri::new("target")]);
        domain.promote_reference(many, vec![Uri::new("target")]);

        let root = domain.root();
        let mut context = ValidationContext::new();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);
        assert!(!context.has_errors());
        assert!(domain.reference(single).resolved && domain.reference(many).resolved);

        // both now point at a reference that does not exist
        let stale = vec![Uri::new("fabric3://domain/composite/target#gone")];
        domain.reference_mut(single).promoted_uris = stale.clone();
        domain.reference_mut(many).promoted_uris = stale;

        let mut context = ValidationContext::new();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        match context.errors() {
            [ValidationError::ReferenceNotFound { promoting, .. }] => {
                assert_eq!(promoting.as_str(), "fabric3://domain/composite#many");
            }
            other => panic!("unexpected errors: {other:?}"),
        }
        assert!(domain.reference(single).resolved);
        assert!(!domain.reference(many).resolved);
    }

    #[test]
    fn test_nested_composites_are_resolved() {
        let (mut domain, composite, _) = fixture();
        let inner = domain
            .add_component(composite, "inner", ComponentDefinition::composite("app"))
            .unwrap();
        let leaf = domain
            .add_component(inner, "leaf", ComponentDefinition::new(ImplementationKind::Java, "app"))
            .unwrap();
        domain
            .add_reference(leaf, "dep", contract("org.acme.A"), Multiplicity::OneOne)
            .unwrap();
        let promoting = domain
            .add_reference(inner, "dep", contract("org.acme.A"), Multiplicity::OneOne)
            .unwrap();
        domain.promote_reference(promoting, vec![Uri::new("leaf")]);

        let mut context = ValidationContext::new();
        let root = domain.root();
        PromotionResolver::new().resolve(&mut domain, root, &mut context);

        assert!(!context.has_errors());
        let reference = domain.reference(promoting);
        assert!(reference.resolved);
        assert_eq!(
            reference.promoted_uris,
            vec![Uri::new("fabric3://domain/composite/inner/leaf#dep")]
        );
    }

    proptest! {
        #[test]
        fn prop_resolution_is_deterministic(
            service_count in 0usize..4,
            reference_count in 0usize..4,
            fragment in proptest::option::of(0usize..4),
        ) {
            let (mut domain, composite, target) = fixture();
            for i in 0..service_count {
                domain.add_service(target, &format!("s{i}"), contract("org.acme.S")).unwrap();
            }
            for i in 0..reference_count {
                domain
                    .add_reference(target, &format!("r{i}"), contract("org.acme.R"), Multiplicity::ZeroN)
                    .unwrap();
            }
            let base = Uri::new("fabric3://domain/composite/target");
            let service_uri = match fragment {
                Some(i) => base.with_fragment(&format!("s{i}")),
                None => base.clone(),
            };
            promote_service(&mut domain, composite, service_uri.as_str());
            let reference = domain
                .add_reference(composite, "promoted", contract("org.acme.R"), Multiplicity::ZeroN)
                .unwrap();
            domain.promote_reference(reference, vec![base]);

            let mut first = domain.clone();
            let mut second = domain;
            let mut first_context = ValidationContext::new();
            let mut second_context = ValidationContext::new();
            let root = first.root();
            PromotionResolver::new().resolve(&mut first, root, &mut first_context);
            PromotionResolver::new().resolve(&mut second, root, &mut second_context);

            prop_assert_eq!(first, second);
            prop_assert_eq!(first_context.errors(), second_context.errors());
        }
    }
}

mod common;

use common::{doc, Fixture};
use proptest::prelude::*;
use workflow_engine::PermissionBackend;
use workflow_types::{Actor, PermissionGrant, PermissionId, RoleId, StateId, Transition, TransitionId};

const ROLES: [&str; 3] = ["editor", "intruder", "viewer"];
const PERMISSIONS: [&str; 3] = ["can_edit", "can_view", "can_publish"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_recompute_is_idempotent(
        published in any::<bool>(),
        noise in prop::collection::vec((0usize..3, 0usize..3), 0..8),
    ) {
        let fx = Fixture::new();
        let document = doc("1");
        fx.engine.set_workflow(&document, "review").unwrap();
        if published {
            fx.engine.set_state(&document, &StateId::new("published")).unwrap();
        }
        for (role, permission) in noise {
            fx.permissions
                .grant_permission(
                    &document,
                    &RoleId::new(ROLES[role]),
                    &PermissionId::new(PERMISSIONS[permission]),
                )
                .unwrap();
        }

        fx.engine.update_permissions(&document).unwrap();
        let once = fx.permissions.permissions_of(&document).unwrap();
        fx.engine.update_permissions(&document).unwrap();
        let twice = fx.permissions.permissions_of(&document).unwrap();
        prop_assert_eq!(&once, &twice);

        // Workflow-managed grants equal the current state's grants exactly
        let managed: Vec<PermissionGrant> = once
            .into_iter()
            .filter(|g| g.permission.as_str() == "can_edit")
            .collect();
        let expected = if published {
            vec![PermissionGrant::new("editor", "can_edit")]
        } else {
            Vec::new()
        };
        prop_assert_eq!(managed, expected);
    }

    #[test]
    fn prop_failed_permission_check_excludes_transition(
        guard in prop_oneof![
            Just("true"),
            Just("false"),
            Just("entity.nope"),
            Just("user.id == 'mallory'"),
        ],
        decoys in any::<bool>(),
    ) {
        let mut fx = Fixture::new();
        let registry = fx.engine.registry_mut();
        registry
            .add_transition(
                Transition::new("gated", "Gated", "review")
                    .with_destination("published")
                    .with_permission("can_gate")
                    .with_condition(guard),
            )
            .unwrap();
        registry
            .add_state_transition(&StateId::new("draft"), &TransitionId::new("gated"))
            .unwrap();

        let document = doc("1");
        fx.engine.set_workflow(&document, "review").unwrap();

        let mallory = Actor::new("mallory");
        if decoys {
            // Mallory gets some role, and someone else gets the permission
            fx.permissions.assign_role("mallory", "viewer").unwrap();
            fx.permissions.assign_role("trent", "gatekeeper").unwrap();
            fx.permissions
                .grant_permission(&document, &RoleId::new("viewer"), &PermissionId::new("can_view"))
                .unwrap();
            fx.permissions
                .grant_permission(&document, &RoleId::new("gatekeeper"), &PermissionId::new("can_gate"))
                .unwrap();
        }

        prop_assert!(!fx.allowed(&document, &mallory).contains(&"gated".to_string()));
        prop_assert!(!fx
            .engine
            .do_transition(&document, &TransitionId::new("gated"), &mallory)
            .unwrap());
        let state = fx.state_of(&document);
        prop_assert_eq!(state.as_deref(), Some("draft"));
    }
}

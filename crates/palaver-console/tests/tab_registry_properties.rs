//! Property-based tests for the tab registry.
//!
//! Every operation is applied to the registry and to a plain `Vec` model.
//! After each step the registry must agree with the model: same tabs in the
//! same slots, focus on the same logical tab, one informational tab.

use std::collections::HashSet;

use palaver_console::{RegistryError, TabId, TabKind, TabRegistry};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Open(u8, TabKind),
    Close(usize),
    Move(usize, usize),
    Focus(usize),
    Next,
    Previous,
}

fn kind_strategy() -> impl Strategy<Value = TabKind> {
    prop_oneof![
        Just(TabKind::Direct),
        Just(TabKind::MultiPartyRoom),
        Just(TabKind::SidePanel),
        Just(TabKind::Informational),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..6, kind_strategy()).prop_map(|(n, kind)| Op::Open(n, kind)),
        2 => (0usize..8).prop_map(Op::Close),
        2 => (0usize..8, 0usize..8).prop_map(|(a, b)| Op::Move(a, b)),
        1 => (0usize..8).prop_map(Op::Focus),
        1 => Just(Op::Next),
        1 => Just(Op::Previous),
    ]
}

/// Reference model: tab ids in slot order plus the focused id.
struct Model {
    tabs: Vec<(TabId, String, TabKind)>,
    focus: TabId,
}

impl Model {
    fn from_registry(registry: &TabRegistry) -> Self {
        Self {
            tabs: registry.iter().map(|t| (t.id(), t.name().to_string(), t.kind())).collect(),
            focus: registry.current_id(),
        }
    }

    fn slot(&self, id: TabId) -> usize {
        self.tabs.iter().position(|(t, ..)| *t == id).unwrap()
    }
}

fn check(registry: &TabRegistry, model: &Model) -> Result<(), TestCaseError> {
    let actual: Vec<(TabId, String, TabKind)> =
        registry.iter().map(|t| (t.id(), t.name().to_string(), t.kind())).collect();
    prop_assert_eq!(&actual, &model.tabs);
    prop_assert_eq!(registry.current_id(), model.focus);
    prop_assert_eq!(registry.focus_index(), model.slot(model.focus));

    for (slot, tab) in registry.iter().enumerate() {
        prop_assert_eq!(registry.slot_of(tab.id()), Some(slot));
    }
    let infos = registry.iter().filter(|t| t.kind() == TabKind::Informational).count();
    prop_assert_eq!(infos, 1);
    let ids: HashSet<TabId> = registry.iter().map(|t| t.id()).collect();
    prop_assert_eq!(ids.len(), registry.len());
    Ok(())
}

fn apply(registry: &mut TabRegistry, model: &mut Model, op: Op) -> Result<(), TestCaseError> {
    match op {
        Op::Open(n, kind) => {
            let name = format!("peer{n}@example.org");
            let exists = model.tabs.iter().any(|(_, nm, k)| *nm == name && *k == kind);
            let result = registry.open(&name, kind);
            if kind == TabKind::Informational {
                prop_assert_eq!(result, Ok(registry.info_id()));
            } else if exists {
                let is_duplicate = matches!(result, Err(RegistryError::DuplicateTab { .. }));
                prop_assert!(is_duplicate);
            } else {
                let id = result.unwrap();
                prop_assert!(model.tabs.iter().all(|(t, ..)| *t != id));
                model.tabs.push((id, name, kind));
            }
        },
        Op::Close(slot) => {
            let Some(&(id, _, kind)) = model.tabs.get(slot) else {
                return Ok(());
            };
            let result = registry.close(id);
            if kind == TabKind::Informational {
                prop_assert_eq!(result.unwrap_err(), RegistryError::CannotCloseSingleton);
                return Ok(());
            }
            let (closed, change) = result.unwrap();
            prop_assert_eq!(closed.id(), id);

            model.tabs.remove(slot);
            if id == model.focus {
                let gained = model.tabs[slot.saturating_sub(1)].0;
                prop_assert_eq!(change.map(|c| (c.lost, c.gained)), Some((id, gained)));
                model.focus = gained;
            } else {
                prop_assert!(change.is_none());
            }
        },
        Op::Move(old, new) => {
            let len = model.tabs.len();
            let result = registry.move_tab(old, new);
            if old >= len || new >= len {
                let is_invalid = matches!(result, Err(RegistryError::InvalidSlot { .. }));
                prop_assert!(is_invalid);
            } else {
                prop_assert!(result.is_ok());
                let tab = model.tabs.remove(old);
                model.tabs.insert(new, tab);
            }
        },
        Op::Focus(slot) => {
            let result = registry.focus_slot(slot);
            match model.tabs.get(slot) {
                None => prop_assert!(result.is_err()),
                Some(&(id, ..)) if id == model.focus => prop_assert_eq!(result, Ok(None)),
                Some(&(id, ..)) => {
                    let change = result.unwrap().unwrap();
                    prop_assert_eq!((change.lost, change.gained), (model.focus, id));
                    model.focus = id;
                },
            }
        },
        Op::Next | Op::Previous => {
            let len = model.tabs.len();
            let slot = model.slot(model.focus);
            let (target, change) = if matches!(op, Op::Next) {
                ((slot + 1) % len, registry.focus_next())
            } else {
                ((slot + len - 1) % len, registry.focus_previous())
            };
            prop_assert_eq!(change.is_some(), len > 1);
            model.focus = model.tabs[target].0;
        },
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_registry_matches_model(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut registry = TabRegistry::new();
        let mut model = Model::from_registry(&registry);

        for op in ops {
            apply(&mut registry, &mut model, op)?;
            check(&registry, &model)?;
        }
    }

    #[test]
    fn prop_reopened_tab_gets_fresh_id(cycles in 1usize..10) {
        let mut registry = TabRegistry::new();
        let mut seen = HashSet::new();
        seen.insert(registry.info_id());

        for _ in 0..cycles {
            let id = registry.open("alice@example.org", TabKind::Direct).unwrap();
            prop_assert!(seen.insert(id));
            registry.close(id).unwrap();
        }
    }
}

/// Registry with the informational tab and four conversations.
fn five_tabs() -> TabRegistry {
    let mut registry = TabRegistry::new();
    for name in ["a", "b", "c", "d"] {
        registry.open(&format!("{name}@example.org"), TabKind::Direct).unwrap();
    }
    registry
}

#[test]
fn every_move_pair_matches_remove_then_insert() {
    for focus in 0..5 {
        for old in 0..5 {
            for new in 0..5 {
                let mut registry = five_tabs();
                registry.focus_slot(focus).unwrap();
                let focused = registry.current_id();

                let mut expected: Vec<TabId> = registry.iter().map(|t| t.id()).collect();
                let moved = expected.remove(old);
                expected.insert(new, moved);

                registry.move_tab(old, new).unwrap();
                let actual: Vec<TabId> = registry.iter().map(|t| t.id()).collect();
                assert_eq!(actual, expected, "move {old} -> {new}");
                assert_eq!(registry.current_id(), focused, "focus after move {old} -> {new}");
            }
        }
    }
}

#[test]
fn find_by_name_is_case_insensitive_and_slot_ordered() {
    let mut registry = TabRegistry::new();
    let room = registry.open("Lounge@muc.example.org", TabKind::MultiPartyRoom).unwrap();
    let direct = registry.open("lou@example.org", TabKind::Direct).unwrap();
    registry.open("bob@example.org", TabKind::Direct).unwrap();

    assert_eq!(registry.find_by_name("LOU", None), [room, direct]);
    assert_eq!(registry.find_by_name("lou", Some(TabKind::Direct)), [direct]);
    assert!(registry.find_by_name("carol", None).is_empty());
}

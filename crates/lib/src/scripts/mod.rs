//! Compiled-in demo scripts.

use std::sync::Arc;

use crate::registry::ScriptRegistry;

pub mod greet;
pub mod inspect;

/// Registry with every built-in script.
pub fn builtin_registry() -> ScriptRegistry {
    let mut registry = ScriptRegistry::new();
    registry.register(Arc::new(greet::Greet));
    registry.register(Arc::new(inspect::Inspect));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered_under_demo() {
        let registry = builtin_registry();
        assert_eq!(registry.paths(), vec!["demo/greet", "demo/inspect"]);
    }

    #[test]
    fn builtin_descriptions_are_nonempty() {
        for script in builtin_registry().scripts() {
            assert!(!script.description().is_empty(), "{}", script.path());
        }
    }
}

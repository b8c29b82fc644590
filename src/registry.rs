//! Process-wide registry of factory-constructible types.
//!
//! The host registers `(abstract, concrete)` pairs at startup, before any
//! interpreter runs; interpretation only reads. Each abstract type name
//! doubles as a valid type tag in the script grammar.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::sync::Mutex;

use crate::factory::Constructible;

type Thunk = Box<dyn Fn() -> Box<dyn Constructible> + Send + Sync>;

/// The constructors registered under one abstract type.
struct Factory {
    constructors: FxHashMap<String, Thunk>,
}

struct Registry {
    /// Abstract type name to its factory.
    factories: FxHashMap<String, Factory>,
    /// Abstract names in registration order, for stable listings.
    order: Vec<String>,
    /// Concrete type name to the abstract name it was first registered under.
    concrete_to_abstract: FxHashMap<String, String>,
}

impl Registry {
    fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
            order: Vec::new(),
            concrete_to_abstract: FxHashMap::default(),
        }
    }

    fn register(&mut self, base: &str, concrete: &str, thunk: Thunk) {
        let factory = match self.factories.get_mut(base) {
            Some(f) => f,
            None => {
                self.order.push(base.to_string());
                self.factories
                    .entry(base.to_string())
                    .or_insert_with(|| Factory { constructors: FxHashMap::default() })
            }
        };
        // Re-registration keeps the first constructor and drops the second.
        factory.constructors.entry(concrete.to_string()).or_insert(thunk);
        self.concrete_to_abstract
            .entry(concrete.to_string())
            .or_insert_with(|| base.to_string());
    }
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::new()));

/// Registers `C` under the abstract type `base` with the script-visible name
/// `concrete`. The zero-argument constructor is `C::default`.
pub fn register<C: Constructible + Default>(base: &str, concrete: &str) {
    register_with(base, concrete, || Box::new(C::default()));
}

/// Registers a concrete type with an explicit constructor thunk, for types
/// whose fresh instances need more than `Default`.
pub fn register_with<F>(base: &str, concrete: &str, thunk: F)
where
    F: Fn() -> Box<dyn Constructible> + Send + Sync + 'static,
{
    REGISTRY.lock().unwrap().register(base, concrete, Box::new(thunk));
}

/// Whether `name` is a registered abstract type (and therefore a type tag).
pub fn is_abstract(name: &str) -> bool {
    REGISTRY.lock().unwrap().factories.contains_key(name)
}

/// The abstract type a concrete name was registered under.
pub fn abstract_of(concrete: &str) -> Option<String> {
    REGISTRY.lock().unwrap().concrete_to_abstract.get(concrete).cloned()
}

/// Whether the factory for `base` can construct `concrete`.
pub fn has_concrete(base: &str, concrete: &str) -> bool {
    REGISTRY
        .lock()
        .unwrap()
        .factories
        .get(base)
        .map(|f| f.constructors.contains_key(concrete))
        .unwrap_or(false)
}

/// A fresh, unparameterized instance of `concrete`, or `None` when the pair
/// is not registered.
pub fn new_instance(base: &str, concrete: &str) -> Option<Box<dyn Constructible>> {
    let registry = REGISTRY.lock().unwrap();
    let thunk = registry.factories.get(base)?.constructors.get(concrete)?;
    Some(thunk())
}

/// Snapshot of the concrete-to-abstract mapping, taken by each new
/// environment.
pub(crate) fn concrete_map() -> FxHashMap<String, String> {
    REGISTRY.lock().unwrap().concrete_to_abstract.clone()
}

/// All registered abstract type names, in registration order.
pub fn abstract_names() -> Vec<String> {
    REGISTRY.lock().unwrap().order.clone()
}

/// The concrete names registered under `base`.
pub fn concrete_names(base: &str) -> Vec<String> {
    REGISTRY
        .lock()
        .unwrap()
        .factories
        .get(base)
        .map(|f| f.constructors.keys().cloned().collect())
        .unwrap_or_default()
}

/// `(abstract, concretes)` pairs for every factory, in registration order.
pub fn factory_listing() -> Vec<(String, Vec<String>)> {
    let registry = REGISTRY.lock().unwrap();
    registry
        .order
        .iter()
        .map(|base| {
            let concretes =
                registry.factories[base].constructors.keys().cloned().collect();
            (base.clone(), concretes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ParamSet;

    #[derive(Default)]
    struct GadgetA {
        tag: i64,
    }
    impl Constructible for GadgetA {
        fn register_params(&self, _params: &mut ParamSet) {}
    }

    struct GadgetB;
    impl Constructible for GadgetB {
        fn register_params(&self, _params: &mut ParamSet) {}
    }

    #[test]
    fn duplicate_registration_keeps_the_first() {
        register_with("RegistryGadget", "Gadget", || Box::new(GadgetA { tag: 1 }));
        register_with("RegistryGadget", "Gadget", || Box::new(GadgetB));

        let instance = new_instance("RegistryGadget", "Gadget").unwrap();
        let object = crate::value::Object::new("Gadget", std::sync::Arc::from(instance));
        assert_eq!(object.downcast::<GadgetA>().unwrap().tag, 1);
        assert!(object.downcast::<GadgetB>().is_none());
    }

    #[test]
    fn lookups() {
        register::<GadgetA>("RegistryWidget", "WidgetA");
        assert!(is_abstract("RegistryWidget"));
        assert!(!is_abstract("WidgetA"));
        assert!(has_concrete("RegistryWidget", "WidgetA"));
        assert!(!has_concrete("RegistryWidget", "WidgetB"));
        assert_eq!(abstract_of("WidgetA").as_deref(), Some("RegistryWidget"));
        assert!(new_instance("NoSuchBase", "WidgetA").is_none());
    }
}

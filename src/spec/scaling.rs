//! Named scaling functions for number specs. The registry is passed into
//! parsing and suite construction explicitly, so concurrent experiments can
//! carry different scaling policies.

use fxhash::FxHashMap;
use std::sync::Arc;

type ScalingFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// A scaling function and its inverse. `scale` maps unscaled (spec) space
/// into the space where creation draws uniformly and mutation perturbs;
/// `unscale` maps back out.
#[derive(Clone)]
pub struct ScalingFns {
    pub scale: ScalingFn,
    pub unscale: ScalingFn,
}

impl ScalingFns {
    pub fn new(
        scale: impl Fn(f64) -> f64 + Send + Sync + 'static,
        unscale: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            scale: Arc::new(scale),
            unscale: Arc::new(unscale),
        }
    }
}

pub struct ScalingRegistry {
    entries: FxHashMap<String, ScalingFns>,
}

impl ScalingRegistry {
    pub fn empty() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, fns: ScalingFns) {
        self.entries.insert(name.into(), fns);
    }

    pub fn get(&self, name: &str) -> Option<&ScalingFns> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for ScalingRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("linear", ScalingFns::new(|x| x, |x| x));
        // log scaling expects positive bounds; validated at suite build
        registry.register("log", ScalingFns::new(f64::ln, f64::exp));
        registry
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builtins_invert() {
        let registry = ScalingRegistry::default();
        for name in ["linear", "log"] {
            let fns = registry.get(name).unwrap();
            for x in [0.5, 1.0, 10.0, 1234.5] {
                let there_and_back = (fns.unscale)((fns.scale)(x));
                assert!(
                    (there_and_back - x).abs() < 1e-9,
                    "{name}: {x} -> {there_and_back}"
                );
            }
        }
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = ScalingRegistry::default();
        registry.register("squared", ScalingFns::new(|x| x * x, f64::sqrt));
        let fns = registry.get("squared").unwrap();
        assert_eq!(9.0, (fns.scale)(3.0));
        assert_eq!(3.0, (fns.unscale)(9.0));
        assert!(registry.get("cubed").is_none());
    }
}

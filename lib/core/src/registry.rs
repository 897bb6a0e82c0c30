// Process-wide registry of engine implementation names.
use parking_lot::RwLock;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Metric,
    Builder,
    Searcher,
    Streamer,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 4] = [
        RegistryKind::Metric,
        RegistryKind::Builder,
        RegistryKind::Searcher,
        RegistryKind::Streamer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RegistryKind::Metric => "metric",
            RegistryKind::Builder => "builder",
            RegistryKind::Searcher => "searcher",
            RegistryKind::Streamer => "streamer",
        }
    }

    fn builtins(self) -> &'static [&'static str] {
        match self {
            RegistryKind::Metric => &[
                "SquaredEuclidean",
                "InnerProduct",
                "Cosine",
                "MipsSquaredEuclidean",
                "Hamming",
            ],
            RegistryKind::Builder => &["FlatBuilder", "HnswBuilder", "IvfBuilder", "InvertBuilder"],
            RegistryKind::Searcher => &["FlatSearcher", "HnswSearcher", "IvfSearcher"],
            RegistryKind::Streamer => &["FlatStreamer", "HnswStreamer"],
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

struct Registry {
    names: [Vec<String>; 4],
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let names = RegistryKind::ALL.map(|kind| {
            kind.builtins().iter().map(|s| s.to_string()).collect()
        });
        RwLock::new(Registry { names })
    })
}

/// Register an implementation name. Returns `false` if it was already present.
pub fn register(kind: RegistryKind, name: impl Into<String>) -> bool {
    let name = name.into();
    let mut reg = registry().write();
    let list = &mut reg.names[kind.slot()];
    if list.iter().any(|n| *n == name) {
        return false;
    }
    tracing::debug!("Registered {} '{}'", kind.name(), name);
    list.push(name);
    true
}

/// Current names of `kind`, in registration order.
pub fn registered(kind: RegistryKind) -> Vec<String> {
    registry().read().names[kind.slot()].clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_present() {
        assert!(registered(RegistryKind::Metric).iter().any(|n| n == "Cosine"));
        assert!(registered(RegistryKind::Builder).iter().any(|n| n == "HnswBuilder"));
    }

    #[test]
    fn test_register_is_append_only() {
        let before = registered(RegistryKind::Streamer).len();
        assert!(register(RegistryKind::Streamer, "UnitTestStreamer"));
        assert!(!register(RegistryKind::Streamer, "UnitTestStreamer"));
        let after = registered(RegistryKind::Streamer);
        assert_eq!(after.len(), before + 1);
        assert_eq!(after.last().map(String::as_str), Some("UnitTestStreamer"));
    }
}

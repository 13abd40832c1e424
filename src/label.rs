//! Naming and labeling conventions that bind every Docker resource created by
//! the harness back to the test that created it.

use rand::Rng;
use std::collections::HashMap;

/// Stable, legacy-compatible label key applied to every network, container,
/// and volume owned by a test. Kept as a plain string (not under the
/// reverse-DNS namespace) for backward compatibility with resources created
/// by earlier harness versions; changing it would orphan leftovers and break
/// the eager-reap property in [`crate::setup::setup`].
pub const PRIMARY_LABEL_KEY: &str = "ibc-test";

/// Reverse-DNS namespace under which additional well-defined label keys live.
pub const NAMESPACE: &str = "dev.ibctest";

/// Label key identifying the logical node that owns a volume.
pub const NODE_OWNER_LABEL_KEY: &str = "dev.ibctest.node-owner";

/// Prefix used for per-test network names, suffixed with random letters.
pub const NETWORK_NAME_PREFIX: &str = "ibctest";

/// A Docker Engine filter, e.g. `label=ibc-test=TestAlpha`
/// (<https://docs.docker.com/engine/reference/commandline/ps/#filter>).
#[derive(Clone, Debug)]
pub struct Filter {
    name: String,
    value: String,
}

impl Filter {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// A filter matching every resource carrying the primary label for `test`.
    pub fn primary_label(test: &str) -> Self {
        Self::new("label", &format!("{PRIMARY_LABEL_KEY}={test}"))
    }
}

pub(crate) trait BollardFilterExt {
    /// Converts the filter list into the format expected by `bollard`'s
    /// list/prune options, combining values that share a key.
    fn to_bollard_filters(&self) -> HashMap<String, Vec<String>>;
}

impl BollardFilterExt for Vec<Filter> {
    fn to_bollard_filters(&self) -> HashMap<String, Vec<String>> {
        self.iter().fold(HashMap::new(), |mut acc, f| {
            acc.entry(f.name.clone()).or_default().push(f.value.clone());
            acc
        })
    }
}

/// Builds the label map applied to the per-test network (and, by the
/// collaborators that create them, to containers and volumes).
pub fn primary_labels(test: &str) -> HashMap<String, String> {
    HashMap::from([(PRIMARY_LABEL_KEY.to_string(), test.to_string())])
}

/// Generates a per-test network name: `<prefix>-<8 random lowercase letters>`.
pub fn random_network_name() -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect();
    format!("{NETWORK_NAME_PREFIX}-{suffix}")
}

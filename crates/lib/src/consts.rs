//! Names, file layouts, and format versions shared across the crate.

pub const APP_NAME: &str = "pomgen";

/// Hand-authored descriptor file name.
pub const BUILD_FILE: &str = "BUILD";

/// Generated descriptor, written where no hand-authored descriptor exists.
pub const GENERATED_BUILD_FILE: &str = "BUILD.gen";

/// Auxiliary descriptor, written next to a hand-authored descriptor.
pub const AUX_BUILD_FILE: &str = "BUILD.aux";

/// Prefix applied to every target name in an auxiliary descriptor.
pub const AUX_TARGET_PREFIX: &str = "aux-";

/// Header written at the top of every generated descriptor file.
pub const GENERATED_HEADER: &str = "# Generated by pomgen. Do not edit: changes are overwritten on the next run.\n";

pub const MANIFEST_FILE: &str = "pom.xml";

/// Optional repository-level configuration file.
pub const CONFIG_FILE: &str = "pomgen.json";

/// Directory (relative to the repository root) holding the third-party aggregate descriptor.
pub const THIRD_PARTY_DIR: &str = "3rdparty";

/// Current cache index format version.
pub const INDEX_VERSION: u32 = 2;

pub const INDEX_FILENAME: &str = "index";
pub const OUTPUTS_INDEX_FILENAME: &str = "outputs-index";
pub const STORE_DIRNAME: &str = "store";
pub const TOOL_HASH_FILENAME: &str = "tool.sha1";

/// Upper bound on `${name}` replacements performed for a single value.
pub const MAX_SUBSTITUTIONS: usize = 100;

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "POMGEN_CACHE_DIR";

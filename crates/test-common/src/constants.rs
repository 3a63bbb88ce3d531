//! Common test constants used across multiple test files.

/// Distribution name of the fixture library
pub const TEST_LIB_NAME: &str = "examplelib";

/// Top-level import package of the fixture library
pub const TEST_PACKAGE: &str = "examplepackage";

/// Version the fake version source reports
pub const TEST_VERSION: &str = "1.2.3";

/// Console script declared by the fixture library
pub const TEST_SCRIPT: &str = "examplescript";

/// Module the fixture console script runs
pub const TEST_SCRIPT_MODULE: &str = "examplepackage.examplescript";

/// Environment variable that points the CLI at a config directory
pub const CONFIG_DIR_ENV: &str = "QUICKPACK_CONFIG_DIR";

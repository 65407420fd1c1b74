// document constants
pub const DOC_ID: &str = "_id";
pub const FIELD_SEPARATOR: char = '.';

// directive constants
pub const DIRECTIVE_SIGIL: char = '$';
pub const REQUIRE_KEY: &str = "$require";
pub const EXTEND_KEY: &str = "$extend";
pub const EVAL_KEY: &str = "$eval";
pub const SET_KEY: &str = "$set";
pub const DIRECTIVE_KEYS: [&str; 4] = [REQUIRE_KEY, EXTEND_KEY, EVAL_KEY, SET_KEY];

// Compile-time assertion for directive keys count
const _: () = {
    const DIRECTIVE_KEYS_COUNT: usize = 4;
    const ACTUAL_COUNT: usize = DIRECTIVE_KEYS.len();
    const _: [(); 1] = [(); (ACTUAL_COUNT == DIRECTIVE_KEYS_COUNT) as usize];
};

// extended value markers
pub const OID_MARKER: &str = "$oid";
pub const DATE_MARKER: &str = "$date";
pub const BINARY_MARKER: &str = "$binary";
pub const REGEX_MARKER: &str = "$regex";
pub const REGEX_OPTIONS_MARKER: &str = "$options";

// namespace constants
pub const SYSTEM_PREFIX: &str = "system.";
pub const OPLOG_PREFIX: &str = "oplog.";
pub const OPLOG_MAIN: &str = "oplog.$main";
pub const OPLOG_REPLSET: &str = "oplog.rs";

// payload file constants
pub const YAML_EXTENSIONS: [&str; 2] = ["yml", "yaml"];
pub const JSON_EXTENSION: &str = "json";

pub const SEEDBED_VERSION: &str = env!("CARGO_PKG_VERSION");

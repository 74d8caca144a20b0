/// Error code registry for job submission
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Definition read errors
/// - 3000-3999: Validation errors
/// - 4000-4999: Expression errors
/// - 5000-5999: Naming errors (duplicates, undefined references)
/// - 6000-6999: Persistence errors
/// - 7000-7999: Precondition errors
/// - 8000-8999: Submission phase codes
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_READ_FAILED: u16 = 1001;
    pub const CONFIG_DISALLOWED_PROPERTY: u16 = 1002;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1003;
    pub const CONFIG_INVALID_VALUE: u16 = 1004;
    pub const CONFIG_PARSE_ERROR: u16 = 1005;

    // Definition read errors (2000-2999)
    pub const DEFINITION_GENERIC: u16 = 2000;
    pub const DEFINITION_READ_FAILED: u16 = 2001;
    pub const DEFINITION_INVALID_URI: u16 = 2002;
    pub const DEFINITION_INCLUDE_CYCLE: u16 = 2003;
    pub const DEFINITION_INCLUDE_TOO_DEEP: u16 = 2004;

    // Validation errors (3000-3999)
    pub const VALIDATION_GENERIC: u16 = 3000;
    pub const VALIDATION_SCHEMA: u16 = 3001;
    pub const VALIDATION_MALFORMED_XML: u16 = 3002;
    pub const VALIDATION_INVALID_ATTRIBUTE: u16 = 3003;
    pub const VALIDATION_MISSING_ELEMENT: u16 = 3004;
    pub const VALIDATION_SLA: u16 = 3005;

    // Expression errors (4000-4999)
    pub const EXPRESSION_GENERIC: u16 = 4000;
    pub const EXPRESSION_SYNTAX: u16 = 4001;
    pub const EXPRESSION_UNDEFINED_VARIABLE: u16 = 4002;
    pub const EXPRESSION_UNDEFINED_FUNCTION: u16 = 4003;
    pub const EXPRESSION_TYPE_MISMATCH: u16 = 4004;
    pub const EXPRESSION_EVALUATION: u16 = 4005;

    // Naming errors (5000-5999)
    pub const NAMING_DUPLICATE: u16 = 5001;
    pub const NAMING_UNDEFINED_REFERENCE: u16 = 5002;

    // Persistence errors (6000-6999)
    pub const PERSISTENCE_GENERIC: u16 = 6000;
    pub const PERSISTENCE_INSERT_FAILED: u16 = 6001;
    pub const PERSISTENCE_DUPLICATE_ID: u16 = 6002;
    pub const PERSISTENCE_SERIALIZATION: u16 = 6003;
    pub const PERSISTENCE_UNAVAILABLE: u16 = 6004;
    pub const PERSISTENCE_NOT_FOUND: u16 = 6005;

    // Precondition errors (7000-7999)
    pub const PRECONDITION_GENERIC: u16 = 7000;
    pub const PRECONDITION_STORE_UNAVAILABLE: u16 = 7001;

    // Submission phase codes (8000-8999)
    pub const SUBMIT_LOADING: u16 = 8001;
    pub const SUBMIT_VALIDATING: u16 = 8002;
    pub const SUBMIT_MERGING_CONFIG: u16 = 8003;
    pub const SUBMIT_RESOLVING: u16 = 8004;
    pub const SUBMIT_ASSEMBLING: u16 = 8005;
    pub const SUBMIT_PERSISTING: u16 = 8006;
    pub const SUBMIT_PRECONDITION: u16 = 8007;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Configuration errors
        1000 => "Generic configuration error",
        1001 => "Default configuration could not be read",
        1002 => "Configuration contains a disallowed property",
        1003 => "Required configuration property is missing",
        1004 => "Invalid value in configuration",
        1005 => "Failed to parse configuration",

        // Definition read errors
        2000 => "Generic definition read error",
        2001 => "Definition could not be read",
        2002 => "Definition path is not a valid URI",
        2003 => "Definition include cycle detected",
        2004 => "Definition includes nested too deeply",

        // Validation errors
        3000 => "Generic validation error",
        3001 => "Definition rejected by schema",
        3002 => "Malformed XML",
        3003 => "Invalid application attribute",
        3004 => "Required element is missing",
        3005 => "SLA block failed validation",

        // Expression errors
        4000 => "Generic expression error",
        4001 => "Expression syntax error",
        4002 => "Expression references an undefined variable",
        4003 => "Expression calls a function unavailable in this phase",
        4004 => "Expression argument has the wrong type",
        4005 => "Expression evaluation failed",

        // Naming errors
        5001 => "Duplicate name",
        5002 => "Reference to an undefined name",

        // Persistence errors
        6000 => "Generic persistence error",
        6001 => "Job insert failed",
        6002 => "Job id already exists",
        6003 => "Job record serialization failed",
        6004 => "Persistence store unavailable",
        6005 => "Job not found",

        // Precondition errors
        7000 => "Generic precondition failure",
        7001 => "Required persistence service is unavailable",

        // Submission phases
        8001 => "Submission failed while loading the definition",
        8002 => "Submission failed while validating the definition",
        8003 => "Submission failed while merging configuration",
        8004 => "Submission failed while resolving the definition",
        8005 => "Submission failed while assembling the definition",
        8006 => "Submission failed while persisting the job",
        8007 => "Submission precondition failed",

        _ => "Unknown error code",
    }
}

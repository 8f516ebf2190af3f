//! Stable `E_*` diagnostic codes for the A0 language core.
//!
//! Every diagnostic and runtime error the core can raise carries one of
//! these codes. The code is the stable, documented contract for
//! programmatic consumers — messages may be reworded, codes may not.
//!
//! # Phases and exit codes
//!
//! A code's [`Phase`] determines which pipeline stage raises it, and
//! [`DiagnosticCode::exit_code`] gives the CLI exit code a front-end
//! should use: `0` success, `1` CLI usage, `2` parse/validate, `3`
//! capability denied, `4` runtime/tool/IO, `5` assert halted (or a
//! failed `check`, which a front-end detects from the evidence list
//! rather than from this enum — `check` never raises).
//!
//! # Example
//!
//! ```
//! use a0_diagnostics_codes::{DiagnosticCode, Phase};
//!
//! let code = DiagnosticCode::EParse;
//! assert_eq!(code.as_str(), "E_PARSE");
//! assert_eq!(code.phase(), Phase::Parse);
//! assert_eq!(code.exit_code(), 2);
//! ```

use std::fmt;

/// Which pipeline stage produces a given code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    Lex,
    Parse,
    Validate,
    Runtime,
}

/// Stable diagnostic/error codes produced anywhere in the A0 core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiagnosticCode {
    // --- Lex/Parse ---
    ELex,
    EParse,
    EAst,
    // --- Validate ---
    ENoReturn,
    EReturnNotLast,
    EUnknownCap,
    ECapValue,
    EUndeclaredCap,
    EImportUnsupported,
    EDupBudget,
    EUnknownBudget,
    EBudgetType,
    EDupBinding,
    EUnbound,
    ECallEffect,
    EFnDup,
    EUnknownFn,
    EUnknownTool,
    // --- Runtime ---
    ECapDenied,
    EIo,
    ETrace,
    EToolArgs,
    ETool,
    EBudget,
    EFn,
    EPath,
    EType,
    EForNotList,
    EMatchNotRecord,
    EMatchNoArm,
    ERuntime,
    EAssert,
}

impl DiagnosticCode {
    /// All codes, in declaration order. Used by tests and by anything
    /// that needs to enumerate the full taxonomy (e.g. a `--list-codes`
    /// CLI flag in a front-end).
    pub const ALL: &'static [DiagnosticCode] = &[
        DiagnosticCode::ELex,
        DiagnosticCode::EParse,
        DiagnosticCode::EAst,
        DiagnosticCode::ENoReturn,
        DiagnosticCode::EReturnNotLast,
        DiagnosticCode::EUnknownCap,
        DiagnosticCode::ECapValue,
        DiagnosticCode::EUndeclaredCap,
        DiagnosticCode::EImportUnsupported,
        DiagnosticCode::EDupBudget,
        DiagnosticCode::EUnknownBudget,
        DiagnosticCode::EBudgetType,
        DiagnosticCode::EDupBinding,
        DiagnosticCode::EUnbound,
        DiagnosticCode::ECallEffect,
        DiagnosticCode::EFnDup,
        DiagnosticCode::EUnknownFn,
        DiagnosticCode::EUnknownTool,
        DiagnosticCode::ECapDenied,
        DiagnosticCode::EIo,
        DiagnosticCode::ETrace,
        DiagnosticCode::EToolArgs,
        DiagnosticCode::ETool,
        DiagnosticCode::EBudget,
        DiagnosticCode::EFn,
        DiagnosticCode::EPath,
        DiagnosticCode::EType,
        DiagnosticCode::EForNotList,
        DiagnosticCode::EMatchNotRecord,
        DiagnosticCode::EMatchNoArm,
        DiagnosticCode::ERuntime,
        DiagnosticCode::EAssert,
    ];

    pub fn as_str(&self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            ELex => "E_LEX",
            EParse => "E_PARSE",
            EAst => "E_AST",
            ENoReturn => "E_NO_RETURN",
            EReturnNotLast => "E_RETURN_NOT_LAST",
            EUnknownCap => "E_UNKNOWN_CAP",
            ECapValue => "E_CAP_VALUE",
            EUndeclaredCap => "E_UNDECLARED_CAP",
            EImportUnsupported => "E_IMPORT_UNSUPPORTED",
            EDupBudget => "E_DUP_BUDGET",
            EUnknownBudget => "E_UNKNOWN_BUDGET",
            EBudgetType => "E_BUDGET_TYPE",
            EDupBinding => "E_DUP_BINDING",
            EUnbound => "E_UNBOUND",
            ECallEffect => "E_CALL_EFFECT",
            EFnDup => "E_FN_DUP",
            EUnknownFn => "E_UNKNOWN_FN",
            EUnknownTool => "E_UNKNOWN_TOOL",
            ECapDenied => "E_CAP_DENIED",
            EIo => "E_IO",
            ETrace => "E_TRACE",
            EToolArgs => "E_TOOL_ARGS",
            ETool => "E_TOOL",
            EBudget => "E_BUDGET",
            EFn => "E_FN",
            EPath => "E_PATH",
            EType => "E_TYPE",
            EForNotList => "E_FOR_NOT_LIST",
            EMatchNotRecord => "E_MATCH_NOT_RECORD",
            EMatchNoArm => "E_MATCH_NO_ARM",
            ERuntime => "E_RUNTIME",
            EAssert => "E_ASSERT",
        }
    }

    pub fn phase(&self) -> Phase {
        use DiagnosticCode::*;
        match self {
            ELex => Phase::Lex,
            EParse | EAst => Phase::Parse,
            ENoReturn | EReturnNotLast | EUnknownCap | ECapValue | EUndeclaredCap
            | EImportUnsupported | EDupBudget | EUnknownBudget | EBudgetType | EDupBinding
            | EUnbound | ECallEffect | EFnDup | EUnknownFn | EUnknownTool => Phase::Validate,
            ECapDenied | EIo | ETrace | EToolArgs | ETool | EBudget | EFn | EPath | EType
            | EForNotList | EMatchNotRecord | EMatchNoArm | ERuntime | EAssert => Phase::Runtime,
        }
    }

    /// CLI exit code a front-end should use when this is the terminal error.
    pub fn exit_code(&self) -> u8 {
        use DiagnosticCode::*;
        match self {
            ELex | EParse | EAst | ENoReturn | EReturnNotLast | EUnknownCap | ECapValue
            | EUndeclaredCap | EImportUnsupported | EDupBudget | EUnknownBudget | EBudgetType
            | EDupBinding | EUnbound | ECallEffect | EFnDup | EUnknownFn | EUnknownTool => 2,
            ECapDenied => 3,
            EIo | ETrace | EToolArgs | ETool | EBudget | EFn | EPath | EType | EForNotList
            | EMatchNotRecord | EMatchNoArm | ERuntime => 4,
            EAssert => 5,
        }
    }

    /// Parses a stable code string back into a [`DiagnosticCode`].
    pub fn parse_code(code: &str) -> Option<DiagnosticCode> {
        use DiagnosticCode::*;
        Some(match code {
            "E_LEX" => ELex,
            "E_PARSE" => EParse,
            "E_AST" => EAst,
            "E_NO_RETURN" => ENoReturn,
            "E_RETURN_NOT_LAST" => EReturnNotLast,
            "E_UNKNOWN_CAP" => EUnknownCap,
            "E_CAP_VALUE" => ECapValue,
            "E_UNDECLARED_CAP" => EUndeclaredCap,
            "E_IMPORT_UNSUPPORTED" => EImportUnsupported,
            "E_DUP_BUDGET" => EDupBudget,
            "E_UNKNOWN_BUDGET" => EUnknownBudget,
            "E_BUDGET_TYPE" => EBudgetType,
            "E_DUP_BINDING" => EDupBinding,
            "E_UNBOUND" => EUnbound,
            "E_CALL_EFFECT" => ECallEffect,
            "E_FN_DUP" => EFnDup,
            "E_UNKNOWN_FN" => EUnknownFn,
            "E_UNKNOWN_TOOL" => EUnknownTool,
            "E_CAP_DENIED" => ECapDenied,
            "E_IO" => EIo,
            "E_TRACE" => ETrace,
            "E_TOOL_ARGS" => EToolArgs,
            "E_TOOL" => ETool,
            "E_BUDGET" => EBudget,
            "E_FN" => EFn,
            "E_PATH" => EPath,
            "E_TYPE" => EType,
            "E_FOR_NOT_LIST" => EForNotList,
            "E_MATCH_NOT_RECORD" => EMatchNotRecord,
            "E_MATCH_NO_ARM" => EMatchNoArm,
            "E_RUNTIME" => ERuntime,
            "E_ASSERT" => EAssert,
            _ => return None,
        })
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec_table() {
        assert_eq!(DiagnosticCode::EParse.exit_code(), 2);
        assert_eq!(DiagnosticCode::ECapDenied.exit_code(), 3);
        assert_eq!(DiagnosticCode::ETool.exit_code(), 4);
        assert_eq!(DiagnosticCode::EAssert.exit_code(), 5);
    }

    #[test]
    fn phase_classification() {
        assert_eq!(DiagnosticCode::ELex.phase(), Phase::Lex);
        assert_eq!(DiagnosticCode::EDupBinding.phase(), Phase::Validate);
        assert_eq!(DiagnosticCode::ECapDenied.phase(), Phase::Runtime);
    }

    #[test]
    fn parse_code_is_inverse_of_as_str_for_every_code() {
        for code in DiagnosticCode::ALL {
            assert_eq!(DiagnosticCode::parse_code(code.as_str()), Some(*code));
        }
    }

    #[test]
    fn unknown_code_string_is_none() {
        assert_eq!(DiagnosticCode::parse_code("E_NOT_A_CODE"), None);
    }
}

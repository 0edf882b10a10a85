//! Typed job parameters and the command-argument builder.
//!
//! A job instance carries an ordered list of [`JobParameter`]s
//! (declaration order is significant and preserved as JSON array
//! order). [`build_command_args`] converts that list into the argv
//! handed to the remote application, plus the two side tables of
//! path-like parameters the remote side must resolve to real
//! filesystem paths.

use serde::{Deserialize, Serialize};

/// Parameter type designating an existing object-storage location
/// usable directly as job input.
pub const PARAM_TYPE_PATH: &str = "path";

/// Parameter type designating an object-storage location whose
/// contents are copied (not extracted) into the job's output location.
pub const PARAM_TYPE_UNEXTPATH: &str = "unextpath";

/// How a parameter's value is rendered on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterAction {
    /// Emit `flag value`.
    #[serde(rename = "store")]
    Store,
    /// Emit `flag` alone when the value is truthy.
    #[serde(rename = "store_true")]
    StoreTrue,
    /// Emit `flag` alone when the value is falsy.
    #[serde(rename = "store_false")]
    StoreFalse,
}

/// One typed parameter of a job instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParameter {
    /// Command-line flag, e.g. `--dir`.
    pub flag: String,
    /// Parameter type: `string`, `boolean`, [`PARAM_TYPE_PATH`],
    /// [`PARAM_TYPE_UNEXTPATH`], ... Unknown types are passed through
    /// as plain store arguments.
    #[serde(rename = "type")]
    pub kind: String,
    /// Command-line rendering rule.
    pub action: ParameterAction,
    /// Parameter value. Strings for `store` parameters, booleans for
    /// the flag actions.
    pub value: serde_json::Value,
}

impl JobParameter {
    /// The value rendered as a command-line string.
    pub fn value_string(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Truthiness of the value for the `store_true` / `store_false`
    /// actions. Mirrors the permissive semantics of the upstream app
    /// descriptors: booleans are taken as-is, anything else is truthy
    /// unless null.
    pub fn is_truthy(&self) -> bool {
        match &self.value {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Null => false,
            _ => true,
        }
    }
}

/// Result of [`build_command_args`].
///
/// The two side tables keep declaration order: input resolution picks
/// the *first* `path` parameter, so a hash map would not do.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    /// Positional/flag argument list for the remote application.
    pub argv: Vec<String>,
    /// `(flag, comma-joined values)` for `unextpath` parameters.
    pub unextpath_params: Vec<(String, String)>,
    /// `(flag, comma-joined values)` for `path` parameters.
    pub path_params: Vec<(String, String)>,
}

impl CommandArgs {
    /// Space-joined argv, as transmitted in the submission payload.
    pub fn joined_argv(&self) -> String {
        self.argv.join(" ")
    }

    /// Comma-joined union of the path-like flag names (`unextpath`
    /// flags first), as transmitted in the submission payload.
    pub fn joined_path_flags(&self) -> String {
        self.unextpath_params
            .iter()
            .chain(self.path_params.iter())
            .map(|(flag, _)| flag.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Two fixed flags always emitted first: they ask the remote app to
/// persist its input-parameter metadata and output-description
/// metadata next to the job output.
const FIXED_FLAGS: [&str; 2] = ["--saveinputmeta", "--saveoutputmeta"];

/// Build the remote command arguments from a job's parameter list.
///
/// Emits the two fixed metadata flags first, then every parameter in
/// declaration order. `store` parameters contribute `flag value` and
/// are additionally bucketed into the `path`/`unextpath` side tables
/// by type; `store_true`/`store_false` parameters contribute the bare
/// flag when their value is truthy/falsy respectively. There is no
/// error path.
pub fn build_command_args(params: &[JobParameter]) -> CommandArgs {
    let mut args = CommandArgs::default();
    for flag in FIXED_FLAGS {
        args.argv.push(flag.to_string());
    }
    for param in params {
        match param.action {
            ParameterAction::Store => {
                let value = param.value_string();
                if param.kind == PARAM_TYPE_UNEXTPATH {
                    args.unextpath_params.push((param.flag.clone(), value.clone()));
                }
                if param.kind == PARAM_TYPE_PATH {
                    args.path_params.push((param.flag.clone(), value.clone()));
                }
                args.argv.push(param.flag.clone());
                args.argv.push(value);
            }
            ParameterAction::StoreTrue => {
                if param.is_truthy() {
                    args.argv.push(param.flag.clone());
                }
            }
            ParameterAction::StoreFalse => {
                if !param.is_truthy() {
                    args.argv.push(param.flag.clone());
                }
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(flag: &str, kind: &str, value: &str) -> JobParameter {
        JobParameter {
            flag: flag.to_string(),
            kind: kind.to_string(),
            action: ParameterAction::Store,
            value: serde_json::Value::String(value.to_string()),
        }
    }

    fn boolean(flag: &str, action: ParameterAction, value: bool) -> JobParameter {
        JobParameter {
            flag: flag.to_string(),
            kind: "boolean".to_string(),
            action,
            value: serde_json::Value::Bool(value),
        }
    }

    #[test]
    fn fixed_metadata_flags_come_first() {
        let args = build_command_args(&[store("--prefix", "string", "out")]);
        assert_eq!(
            args.argv,
            vec!["--saveinputmeta", "--saveoutputmeta", "--prefix", "out"]
        );
    }

    #[test]
    fn argv_follows_declaration_order() {
        let args = build_command_args(&[
            store("--b", "string", "2"),
            store("--a", "string", "1"),
        ]);
        assert_eq!(&args.argv[2..], &["--b", "2", "--a", "1"]);
    }

    #[test]
    fn path_like_parameters_are_bucketed_and_still_emitted() {
        let args = build_command_args(&[
            store("--in", "path", "alice/uploads"),
            store("--extra", "unextpath", "alice/models,alice/weights"),
        ]);
        assert_eq!(
            args.path_params,
            vec![("--in".to_string(), "alice/uploads".to_string())]
        );
        assert_eq!(
            args.unextpath_params,
            vec![(
                "--extra".to_string(),
                "alice/models,alice/weights".to_string()
            )]
        );
        assert_eq!(
            &args.argv[2..],
            &["--in", "alice/uploads", "--extra", "alice/models,alice/weights"]
        );
        assert_eq!(args.joined_path_flags(), "--extra,--in");
    }

    #[test]
    fn store_true_emits_flag_only_when_set() {
        let args = build_command_args(&[
            boolean("--verbose", ParameterAction::StoreTrue, true),
            boolean("--quiet", ParameterAction::StoreTrue, false),
        ]);
        assert_eq!(&args.argv[2..], &["--verbose"]);
    }

    #[test]
    fn store_false_emits_flag_only_when_unset() {
        let args = build_command_args(&[
            boolean("--no-cache", ParameterAction::StoreFalse, false),
            boolean("--cache", ParameterAction::StoreFalse, true),
        ]);
        assert_eq!(&args.argv[2..], &["--no-cache"]);
    }

    #[test]
    fn unknown_types_pass_through_as_plain_store_arguments() {
        let args = build_command_args(&[store("--n", "galaxy", "7")]);
        assert_eq!(&args.argv[2..], &["--n", "7"]);
        assert!(args.path_params.is_empty());
        assert!(args.unextpath_params.is_empty());
    }
}

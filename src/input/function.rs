use crate::error::{Error, Result};
use crate::function::{FunctionInput, Interpolant};
use std::path::PathBuf;

/// Unvalidated function input, keyed by a source string.
///
/// `constant` requires `value`, `interpolation` requires `function` and `xdmf` requires both
/// `file` and `name`.
#[derive(Debug, Clone, Default)]
pub struct FunctionRecord {
    pub source: String,
    pub value: Option<Vec<f64>>,
    pub function: Option<Interpolant>,
    pub file: Option<PathBuf>,
    pub name: Option<String>,
}

impl FunctionRecord {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_value(self, value: Vec<f64>) -> Self {
        Self {
            value: Some(value),
            ..self
        }
    }

    pub fn with_function(self, function: Interpolant) -> Self {
        Self {
            function: Some(function),
            ..self
        }
    }

    pub fn with_file(self, file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            ..self
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn build(self) -> Result<FunctionInput> {
        const RECORD: &str = "function";
        let missing = |field| Error::MissingField { record: RECORD, field };
        match self.source.as_str() {
            "constant" => {
                let value = self.value.ok_or_else(|| missing("value"))?;
                Ok(FunctionInput::constant(&value))
            }
            "interpolation" => {
                let function = self.function.ok_or_else(|| missing("function"))?;
                Ok(FunctionInput::Interpolation(function))
            }
            "xdmf" => {
                let file = self.file.ok_or_else(|| missing("file"))?;
                let name = self.name.ok_or_else(|| missing("name"))?;
                Ok(FunctionInput::Xdmf { file, name })
            }
            other => Err(Error::InvalidInput(format!(
                "unknown function source \"{other}\" (expected constant, interpolation or xdmf)"
            ))),
        }
    }
}

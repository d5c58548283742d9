use std::path::Path;

use serde_json::{Map, Value};

use crate::error::HarnessError;

/// The nbformat major version the reader accepts.
pub const NB_FORMAT_VERSION: u64 = 4;

/// MIME types whose payload nbformat stores as a list of lines on disk.
fn is_multiline_mime(mime: &str) -> bool {
    mime.starts_with("text/") || mime == "application/javascript" || mime == "image/svg+xml"
}

/// The `output_type` of a code cell output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    ExecuteResult,
    Stream,
    Other(String),
}

impl OutputKind {
    pub fn parse(output_type: &str) -> Self {
        match output_type {
            "execute_result" => OutputKind::ExecuteResult,
            "stream" => OutputKind::Stream,
            other => OutputKind::Other(other.to_string()),
        }
    }

    fn matches(&self, output: &Value) -> bool {
        output
            .get("output_type")
            .and_then(|v| v.as_str())
            .is_some_and(|t| OutputKind::parse(t) == *self)
    }
}

/// A parsed nbformat 4 notebook.
///
/// The whole JSON document is kept so that every field, including ones this
/// crate does not know about, takes part in comparison. `Clone` is a full
/// deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    root: Value,
}

impl Notebook {
    /// Read and validate a notebook file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_slice(&data)
    }

    /// Parse and validate notebook JSON bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, HarnessError> {
        let text = std::str::from_utf8(data).map_err(|e| HarnessError::MalformedNotebook {
            reason: format!("invalid UTF-8: {e}"),
        })?;

        let root: Value =
            serde_json::from_str(text).map_err(|e| HarnessError::MalformedNotebook {
                reason: format!("invalid JSON: {e}"),
            })?;

        Self::from_value(root)
    }

    /// Validate an already parsed document.
    pub fn from_value(mut root: Value) -> Result<Self, HarnessError> {
        let obj = root
            .as_object_mut()
            .ok_or_else(|| HarnessError::MalformedNotebook {
                reason: "notebook root is not a JSON object".to_string(),
            })?;

        match obj.get("nbformat") {
            Some(Value::Number(n)) if n.as_u64() == Some(NB_FORMAT_VERSION) => {}
            Some(other) => {
                return Err(HarnessError::UnsupportedVersion {
                    found: other.to_string(),
                });
            }
            None => {
                return Err(HarnessError::MalformedNotebook {
                    reason: "notebook missing \"nbformat\" version".to_string(),
                });
            }
        }

        let cells = obj
            .get_mut("cells")
            .and_then(|v| v.as_array_mut())
            .ok_or_else(|| HarnessError::MalformedNotebook {
                reason: "notebook missing \"cells\" array".to_string(),
            })?;

        for (i, cell) in cells.iter_mut().enumerate() {
            let cell = cell
                .as_object_mut()
                .ok_or_else(|| HarnessError::MalformedNotebook {
                    reason: format!("cell {i} is not a JSON object"),
                })?;
            if !cell.get("cell_type").is_some_and(Value::is_string) {
                return Err(HarnessError::MalformedNotebook {
                    reason: format!("cell {i} missing \"cell_type\""),
                });
            }
            rejoin_cell(cell);
        }

        Ok(Self { root })
    }

    /// Serialize back to nbformat JSON.
    pub fn to_vec(&self) -> Result<Vec<u8>, HarnessError> {
        serde_json::to_vec(&self.root).map_err(|e| HarnessError::MalformedNotebook {
            reason: format!("failed to serialize notebook: {e}"),
        })
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    pub fn cells(&self) -> &[Value] {
        self.root
            .get("cells")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Apply `f` to every output of the given kind in every code cell.
    pub fn code_outputs_mut<F>(&mut self, kind: &OutputKind, mut f: F)
    where
        F: FnMut(&mut Map<String, Value>),
    {
        let Some(cells) = self.root.get_mut("cells").and_then(|v| v.as_array_mut()) else {
            return;
        };

        for cell in cells {
            if cell.get("cell_type").and_then(|v| v.as_str()) != Some("code") {
                continue;
            }
            let Some(outputs) = cell.get_mut("outputs").and_then(|v| v.as_array_mut()) else {
                continue;
            };
            for output in outputs {
                if !kind.matches(output) {
                    continue;
                }
                if let Some(obj) = output.as_object_mut() {
                    f(obj);
                }
            }
        }
    }
}

/// Join a value stored as a list of lines into a single string.
///
/// nbformat allows multi-line strings either as a string or an array of strings.
fn rejoin_lines(value: &mut Value) {
    if let Value::Array(arr) = value
        && arr.iter().all(Value::is_string)
    {
        let joined: String = arr.iter().filter_map(|v| v.as_str()).collect();
        *value = Value::String(joined);
    }
}

fn rejoin_cell(cell: &mut Map<String, Value>) {
    if let Some(source) = cell.get_mut("source") {
        rejoin_lines(source);
    }

    let Some(outputs) = cell.get_mut("outputs").and_then(|v| v.as_array_mut()) else {
        return;
    };

    for output in outputs.iter_mut().filter_map(Value::as_object_mut) {
        let kind = output
            .get("output_type")
            .and_then(|v| v.as_str())
            .map(OutputKind::parse);
        match kind {
            Some(OutputKind::Stream) => {
                if let Some(text) = output.get_mut("text") {
                    rejoin_lines(text);
                }
            }
            Some(OutputKind::ExecuteResult) => rejoin_mime_bundle(output),
            Some(OutputKind::Other(ref t)) if t == "display_data" => rejoin_mime_bundle(output),
            _ => {}
        }
    }
}

fn rejoin_mime_bundle(output: &mut Map<String, Value>) {
    if let Some(data) = output.get_mut("data").and_then(|v| v.as_object_mut()) {
        for (mime, payload) in data.iter_mut() {
            if is_multiline_mime(mime) {
                rejoin_lines(payload);
            }
        }
    }
}

//! CSV export of recorded histories.

use std::path::{Path, PathBuf};

use tw_core::Value;
use tw_sim::{History, PortSide};

use crate::error::{AppError, AppResult};

fn cell(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::Scalar(v)) => v.to_string(),
        Some(Value::Vector(vs)) => vs
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(";"),
    }
}

/// One component's recorded ports as CSV: a `time_s` column and one column per port.
///
/// Undefined values are left empty; vector values are joined with `;`.
pub fn history_csv(history: &History, component: &str, side: PortSide) -> AppResult<String> {
    let record = history
        .component(component)
        .ok_or_else(|| AppError::ComponentNotFound(component.to_string()))?;
    let series = record.side(side);

    let mut csv = String::from("time_s");
    for port in series.keys() {
        csv.push(',');
        csv.push_str(port);
    }
    csv.push('\n');

    for (i, t) in history.time_s.iter().enumerate() {
        csv.push_str(&t.to_string());
        for values in series.values() {
            csv.push(',');
            csv.push_str(&cell(values.get(i).and_then(Option::as_ref)));
        }
        csv.push('\n');
    }
    Ok(csv)
}

/// Write `<component>_input.csv` / `<component>_output.csv` for every recorded
/// component with ports on that side. Returns the written paths.
pub fn write_history(dir: &Path, history: &History) -> AppResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (id, record) in &history.components {
        for (side, suffix) in [(PortSide::Input, "input"), (PortSide::Output, "output")] {
            if record.side(side).is_empty() {
                continue;
            }
            let path = dir.join(format!("{}_{}.csv", id, suffix));
            std::fs::write(&path, history_csv(history, id.as_str(), side)?)?;
            written.push(path);
        }
    }
    Ok(written)
}

//! Chart option structures (ECharts-compatible JSON).

use serde_json::{json, Value};

/// Horizontal ranked bar chart: one bar per label, first label on top.
pub fn hbar(labels: &[String], values: &[f64]) -> Value {
    json!({
        "backgroundColor": "",
        "tooltip": { "trigger": "axis", "axisPointer": { "type": "shadow" } },
        "grid": { "left": "3%", "right": "4%", "bottom": "3%", "containLabel": true },
        "xAxis": { "type": "value", "axisLabel": { "fontSize": 24 } },
        "yAxis": {
            "type": "category",
            "data": labels,
            "inverse": true,
            "axisLabel": { "fontSize": 36 }
        },
        "series": [{ "data": values, "type": "bar" }]
    })
}

/// Category x-axis series chart (`line` or `bar`).
pub fn series(kind: SeriesKind, x: &[String], y: &[f64]) -> Value {
    json!({
        "backgroundColor": "",
        "tooltip": { "trigger": "axis" },
        "xAxis": { "type": "category", "data": x, "axisLabel": { "fontSize": 18 } },
        "yAxis": { "type": "value", "axisLabel": { "fontSize": 18 } },
        "series": [{ "data": y, "type": kind.as_str() }]
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
    Bar,
}

impl SeriesKind {
    fn as_str(self) -> &'static str {
        match self {
            SeriesKind::Line => "line",
            SeriesKind::Bar => "bar",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hbar_carries_labels_and_values() {
        let opt = hbar(&["甲".into(), "乙".into()], &[3.0, 1.5]);
        assert_eq!(opt["yAxis"]["data"], json!(["甲", "乙"]));
        assert_eq!(opt["series"][0]["data"], json!([3.0, 1.5]));
        assert_eq!(opt["series"][0]["type"], "bar");
        assert_eq!(opt["yAxis"]["inverse"], true);
    }

    #[test]
    fn nan_points_become_null() {
        let opt = series(SeriesKind::Line, &["a".into(), "b".into()], &[1.0, f64::NAN]);
        assert_eq!(opt["series"][0]["data"], json!([1.0, null]));
        assert_eq!(opt["series"][0]["type"], "line");
    }
}

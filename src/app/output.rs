use crate::core::recommender::Recommendation;
use crate::utils::error::{RecError, Result};

pub fn render(recommendation: &Recommendation, format: &str) -> Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(recommendation)?),
        "csv" => render_csv(recommendation),
        other => Err(RecError::InvalidConfigValueError {
            field: "output.format".to_string(),
            value: other.to_string(),
            reason: "Unsupported output format".to_string(),
        }),
    }
}

/// One row per hall. Empty outcomes become a single `message` column.
pub fn render_csv(recommendation: &Recommendation) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    match recommendation {
        Recommendation::Halls(halls) => {
            writer.write_record(["rank", "hall_id", "hall", "score", "basis", "top_dishes"])?;
            for (index, rec) in halls.iter().enumerate() {
                let dishes = rec
                    .top_dishes
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                writer.write_record([
                    (index + 1).to_string(),
                    rec.hall.id.to_string(),
                    rec.hall.name.clone(),
                    format!("{:.3}", rec.score),
                    rec.basis.as_str().to_string(),
                    dishes,
                ])?;
            }
        }
        other => {
            writer.write_record(["message"])?;
            writer.write_record([other.message().unwrap_or_default()])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| RecError::IoError(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

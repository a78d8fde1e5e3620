use super::FunnelStore;
use crate::error::FunnelResult;
use rusqlite::types::Value;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadsPreview {
    pub campaign_name: String,
    pub total_leads:   i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiPreview {
    pub campaign_name:  String,
    pub total_revenue:  Option<f64>,
    pub budget:         Option<f64>,
    pub profit_or_loss: Option<f64>,
    pub roi_percentage: Option<f64>,
}

/// Campaign names may have been loaded as numbers; show them as text.
fn display_value(value: Value) -> String {
    match value {
        Value::Null       => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f)    => f.to_string(),
        Value::Text(s)    => s,
        Value::Blob(b)    => String::from_utf8_lossy(&b).into_owned(),
    }
}

impl FunnelStore {
    // ── Read-only previews over the script's tables ────────────

    pub fn leads_per_campaign(&self) -> FunnelResult<Vec<LeadsPreview>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.campaign_name, COUNT(l.lead_id) AS total_leads
             FROM Campaigns c
             LEFT JOIN Leads l ON c.campaign_id = l.campaign_id
             GROUP BY c.campaign_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LeadsPreview {
                campaign_name: display_value(row.get(0)?),
                total_leads:   row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn roi_per_campaign(&self) -> FunnelResult<Vec<RoiPreview>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.campaign_name,
                    ROUND(SUM(cv.revenue_generated), 2) AS total_revenue,
                    c.budget,
                    ROUND(SUM(cv.revenue_generated) - c.budget, 2) AS profit_or_loss,
                    ROUND((SUM(cv.revenue_generated) - c.budget) * 100.0 / c.budget, 2) AS roi_percentage
             FROM Campaigns c
             LEFT JOIN Leads l ON c.campaign_id = l.campaign_id
             LEFT JOIN Conversions cv ON l.lead_id = cv.lead_id
             GROUP BY c.campaign_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RoiPreview {
                campaign_name:  display_value(row.get(0)?),
                total_revenue:  row.get(1)?,
                budget:         row.get(2)?,
                profit_or_loss: row.get(3)?,
                roi_percentage: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

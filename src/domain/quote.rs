//! Upstream J-Quants rows and their canonical renamed forms.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Daily bar as returned by `/equities/bars/daily`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDailyBar {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "O", default)]
    pub open: Option<f64>,
    #[serde(rename = "H", default)]
    pub high: Option<f64>,
    #[serde(rename = "L", default)]
    pub low: Option<f64>,
    #[serde(rename = "C", default)]
    pub close: Option<f64>,
    #[serde(rename = "Vo", default)]
    pub volume: Option<f64>,
    #[serde(rename = "Va", default)]
    pub turnover_value: Option<f64>,
    #[serde(rename = "AdjFactor", default)]
    pub adjustment_factor: Option<f64>,
    #[serde(rename = "AdjO", default)]
    pub adjustment_open: Option<f64>,
    #[serde(rename = "AdjH", default)]
    pub adjustment_high: Option<f64>,
    #[serde(rename = "AdjL", default)]
    pub adjustment_low: Option<f64>,
    #[serde(rename = "AdjC", default)]
    pub adjustment_close: Option<f64>,
    #[serde(rename = "AdjVo", default)]
    pub adjustment_volume: Option<f64>,
}

/// Close column a series is priced in, chosen once for the whole series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseColumn {
    Adjusted,
    Raw,
}

impl CloseColumn {
    /// `AdjC` when any bar carries it, otherwise `C`.
    pub fn for_bars<'a, I>(bars: I) -> Self
    where
        I: IntoIterator<Item = &'a RawDailyBar>,
    {
        if bars.into_iter().any(|b| b.adjustment_close.is_some()) {
            CloseColumn::Adjusted
        } else {
            CloseColumn::Raw
        }
    }

    pub fn close(self, bar: &RawDailyBar) -> Option<f64> {
        match self {
            CloseColumn::Adjusted => bar.adjustment_close,
            CloseColumn::Raw => bar.close,
        }
    }
}

/// Listed-issue master row as returned by `/equities/master`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListedInfo {
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "CoName", default)]
    pub company_name: Option<String>,
    #[serde(rename = "CoNameEn", default)]
    pub company_name_english: Option<String>,
    #[serde(rename = "S17", default)]
    pub sector_17_code: Option<String>,
    #[serde(rename = "S17Nm", default)]
    pub sector_17_code_name: Option<String>,
    #[serde(rename = "S33", default)]
    pub sector_33_code: Option<String>,
    #[serde(rename = "S33Nm", default)]
    pub sector_33_code_name: Option<String>,
    #[serde(rename = "Mkt", default)]
    pub market_code: Option<String>,
    #[serde(rename = "MktNm", default)]
    pub market_code_name: Option<String>,
}

/// Financial statement summary row as returned by `/fins/summary`.
///
/// Upstream sends figures as strings, sometimes empty; they are kept as text
/// with empty values read as `None`. Columns not listed here are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFinancialStatement {
    #[serde(rename = "Code", default, deserialize_with = "code_text")]
    pub code: String,
    #[serde(rename = "DiscDate", default, deserialize_with = "optional_text")]
    pub disclosed_date: Option<String>,
    #[serde(rename = "DiscTime", default, deserialize_with = "optional_text")]
    pub disclosed_time: Option<String>,
    #[serde(rename = "DiscNo", default, deserialize_with = "optional_text")]
    pub disclosure_number: Option<String>,
    #[serde(rename = "DocType", default, deserialize_with = "optional_text")]
    pub document_type: Option<String>,
    #[serde(rename = "CurPerType", default, deserialize_with = "optional_text")]
    pub period_type: Option<String>,
    #[serde(rename = "CurPerSt", default, deserialize_with = "optional_text")]
    pub period_start: Option<String>,
    #[serde(rename = "CurPerEn", default, deserialize_with = "optional_text")]
    pub period_end: Option<String>,
    #[serde(rename = "CurFYSt", default, deserialize_with = "optional_text")]
    pub fiscal_year_start: Option<String>,
    #[serde(rename = "CurFYEn", default, deserialize_with = "optional_text")]
    pub fiscal_year_end: Option<String>,
    #[serde(rename = "Sales", default, deserialize_with = "optional_text")]
    pub net_sales: Option<String>,
    #[serde(rename = "OP", default, deserialize_with = "optional_text")]
    pub operating_profit: Option<String>,
    #[serde(rename = "OdP", default, deserialize_with = "optional_text")]
    pub ordinary_profit: Option<String>,
    #[serde(rename = "NP", default, deserialize_with = "optional_text")]
    pub profit: Option<String>,
    #[serde(rename = "EPS", default, deserialize_with = "optional_text")]
    pub earnings_per_share: Option<String>,
    #[serde(rename = "DEPS", default, deserialize_with = "optional_text")]
    pub diluted_earnings_per_share: Option<String>,
    #[serde(rename = "TA", default, deserialize_with = "optional_text")]
    pub total_assets: Option<String>,
    #[serde(rename = "Eq", default, deserialize_with = "optional_text")]
    pub equity: Option<String>,
    #[serde(rename = "EqAR", default, deserialize_with = "optional_text")]
    pub equity_to_asset_ratio: Option<String>,
    #[serde(rename = "BPS", default, deserialize_with = "optional_text")]
    pub book_value_per_share: Option<String>,
    #[serde(rename = "CFO", default, deserialize_with = "optional_text")]
    pub operating_cash_flow: Option<String>,
    #[serde(rename = "CFI", default, deserialize_with = "optional_text")]
    pub investing_cash_flow: Option<String>,
    #[serde(rename = "CFF", default, deserialize_with = "optional_text")]
    pub financing_cash_flow: Option<String>,
    #[serde(rename = "CashEq", default, deserialize_with = "optional_text")]
    pub cash_and_equivalents: Option<String>,
    #[serde(rename = "FSales", default, deserialize_with = "optional_text")]
    pub forecast_net_sales: Option<String>,
    #[serde(rename = "FOP", default, deserialize_with = "optional_text")]
    pub forecast_operating_profit: Option<String>,
    #[serde(rename = "FOdP", default, deserialize_with = "optional_text")]
    pub forecast_ordinary_profit: Option<String>,
    #[serde(rename = "FNP", default, deserialize_with = "optional_text")]
    pub forecast_profit: Option<String>,
    #[serde(rename = "FEPS", default, deserialize_with = "optional_text")]
    pub forecast_earnings_per_share: Option<String>,
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let v = v.trim();
        Ok((!v.is_empty()).then(|| v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(v.is_finite().then(|| v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_any(TextVisitor)
    }
}

fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    d.deserialize_option(TextVisitor)
}

/// Codes arrive as text from the API but may be numeric in hand-made files.
fn code_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(optional_text(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
    pub date: String,
    pub code: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub turnover_value: Option<f64>,
    pub adjustment_factor: Option<f64>,
    pub adjustment_open: Option<f64>,
    pub adjustment_high: Option<f64>,
    pub adjustment_low: Option<f64>,
    pub adjustment_close: Option<f64>,
    pub adjustment_volume: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockInfo {
    pub code: String,
    pub company_name: String,
    pub company_name_english: String,
    pub sector_17_code: String,
    pub sector_17_code_name: String,
    pub sector_33_code: String,
    pub sector_33_code_name: String,
    pub market_code: String,
    pub market_code_name: String,
}

impl From<&RawListedInfo> for StockInfo {
    fn from(raw: &RawListedInfo) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        StockInfo {
            code: raw.code.clone(),
            company_name: text(&raw.company_name),
            company_name_english: text(&raw.company_name_english),
            sector_17_code: text(&raw.sector_17_code),
            sector_17_code_name: text(&raw.sector_17_code_name),
            sector_33_code: text(&raw.sector_33_code),
            sector_33_code_name: text(&raw.sector_33_code_name),
            market_code: text(&raw.market_code),
            market_code_name: text(&raw.market_code_name),
        }
    }
}

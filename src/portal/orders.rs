//! Production orders scraped from the portal's export table

use super::error::PortalError;
use chrono::{NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Text the portal renders instead of a table when nothing matched
pub const NO_RESULTS_MARKERS: &[&str] = &["Nenhuma ordem de produção encontrada.", "No orders found"];

const DELIVER_DATE_COL: usize = 1;
const CODE_COL: usize = 2;
const PRODUCT_COL: usize = 4;
const DESCRIPTION_COL: usize = 5;
const QUANTITY_COL: usize = 6;
const MIN_CELLS: usize = QUANTITY_COL + 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(with = "deliver_date_format")]
    pub deliver_date: NaiveDateTime,
    pub code: i64,
    pub product: String,
    pub description: String,
    pub quantity: i64,
}

/// Orders keyed by stringified order code. A repeated code keeps the last row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBatch {
    orders: BTreeMap<String, Order>,
}

impl OrderBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, order: Order) {
        self.orders.insert(order.code.to_string(), order);
    }

    pub fn get(&self, code: &str) -> Option<&Order> {
        self.orders.get(code)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Order)> {
        self.orders.iter()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// What an export response contained
#[derive(Debug, PartialEq)]
pub enum OrdersPage {
    NoResults,
    NoTable,
    NoRows,
    Orders(OrderBatch),
}

pub fn parse_orders_page(html: &str) -> Result<OrdersPage, PortalError> {
    let document = Html::parse_document(html);

    let text = document.root_element().text().collect::<String>().to_lowercase();
    if NO_RESULTS_MARKERS
        .iter()
        .any(|marker| text.contains(&marker.to_lowercase()))
    {
        return Ok(OrdersPage::NoResults);
    }

    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let table = match document.select(&table_sel).next() {
        Some(table) => table,
        None => return Ok(OrdersPage::NoTable),
    };

    let rows: Vec<ElementRef> = table.select(&row_sel).skip(1).collect();
    if rows.is_empty() {
        return Ok(OrdersPage::NoRows);
    }

    let mut batch = OrderBatch::new();
    for (idx, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        match parse_row(&cells) {
            Ok(Some(order)) => batch.insert(order),
            Ok(None) => log::debug!("Skipping row {} with {} cells", idx + 1, cells.len()),
            Err(e) => log::warn!("⚠️  Skipping row {}: {}", idx + 1, e),
        }
    }

    Ok(OrdersPage::Orders(batch))
}

/// `None` when the row lacks cells, `Err` when a cell does not parse
pub fn parse_row(cells: &[String]) -> Result<Option<Order>, PortalError> {
    if cells.len() < MIN_CELLS {
        return Ok(None);
    }

    let deliver_date = parse_deliver_date(&cells[DELIVER_DATE_COL]).ok_or_else(|| {
        PortalError::Parse(format!("bad delivery date {:?}", cells[DELIVER_DATE_COL]))
    })?;

    let code = cells[CODE_COL]
        .rsplit('-')
        .next()
        .map(str::trim)
        .and_then(|segment| segment.parse::<i64>().ok())
        .ok_or_else(|| PortalError::Parse(format!("bad order code {:?}", cells[CODE_COL])))?;

    let quantity = cells[QUANTITY_COL]
        .parse::<i64>()
        .map_err(|_| PortalError::Parse(format!("bad quantity {:?}", cells[QUANTITY_COL])))?;

    Ok(Some(Order {
        deliver_date,
        code,
        product: cells[PRODUCT_COL].clone(),
        description: cells[DESCRIPTION_COL].clone(),
        quantity,
    }))
}

pub fn parse_deliver_date(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn selector(css: &str) -> Result<Selector, PortalError> {
    Selector::parse(css).map_err(|e| PortalError::Parse(format!("selector {:?}: {:?}", css, e)))
}

mod deliver_date_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        <html><body>
        <table class="items">
          <tr><th>#</th><th>Entrega</th><th>OP</th><th>Cliente</th><th>Material</th><th>Descrição</th><th>Qtd</th></tr>
          <tr><td>1</td><td>2025-12-03</td><td>OP-2025-1187</td><td>ACME</td><td>TKC110 002 002</td><td>Caixa reforçada</td><td>40</td></tr>
          <tr><td>2</td><td>2025-12-05 14:30:00</td><td>OP-2025-1190</td><td>ACME</td><td>TKC120</td><td>Tampa</td><td>12</td></tr>
          <tr><td colspan="7">subtotal</td></tr>
          <tr><td>3</td><td>amanhã</td><td>OP-2025-1191</td><td>ACME</td><td>X</td><td>Y</td><td>1</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_table_rows() {
        let page = parse_orders_page(TABLE).unwrap();
        let batch = match page {
            OrdersPage::Orders(batch) => batch,
            other => panic!("unexpected page: {:?}", other),
        };

        assert_eq!(batch.len(), 2);

        let first = batch.get("1187").unwrap();
        assert_eq!(first.code, 1187);
        assert_eq!(first.product, "TKC110 002 002");
        assert_eq!(first.description, "Caixa reforçada");
        assert_eq!(first.quantity, 40);
        assert_eq!(
            first.deliver_date,
            NaiveDate::from_ymd_opt(2025, 12, 3).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );

        let second = batch.get("1190").unwrap();
        assert_eq!(second.deliver_date.format("%H:%M").to_string(), "14:30");
    }

    #[test]
    fn test_no_results_marker() {
        let html = "<html><body><div class=\"empty\">Nenhuma ordem de produção encontrada.</div></body></html>";
        assert_eq!(parse_orders_page(html).unwrap(), OrdersPage::NoResults);

        let english = "<html><body><table><tr><td>No orders found</td></tr></table></body></html>";
        assert_eq!(parse_orders_page(english).unwrap(), OrdersPage::NoResults);
    }

    #[test]
    fn test_missing_table() {
        let html = "<html><body><p>Exportação indisponível</p></body></html>";
        assert_eq!(parse_orders_page(html).unwrap(), OrdersPage::NoTable);
    }

    #[test]
    fn test_header_only_table() {
        let html = "<table><tr><th>Entrega</th></tr></table>";
        assert_eq!(parse_orders_page(html).unwrap(), OrdersPage::NoRows);
    }

    #[test]
    fn test_short_row_is_skipped() {
        let cells: Vec<String> = ["1", "2025-12-03", "OP-1"].iter().map(|s| s.to_string()).collect();
        assert!(parse_row(&cells).unwrap().is_none());
    }

    #[test]
    fn test_bad_code_is_parse_error() {
        let cells: Vec<String> = ["1", "2025-12-03", "OP-ABC", "c", "p", "d", "3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(matches!(parse_row(&cells), Err(PortalError::Parse(_))));
    }

    #[test]
    fn test_deliver_date_formats() {
        assert!(parse_deliver_date("2025-12-03T08:00:00").is_some());
        assert!(parse_deliver_date("03/12/2025").is_some());
        assert!(parse_deliver_date("03/12/2025 08:15").is_some());
        assert!(parse_deliver_date("December 3rd").is_none());
    }

    #[test]
    fn test_batch_json_layout() {
        let mut batch = OrderBatch::new();
        batch.insert(Order {
            deliver_date: NaiveDate::from_ymd_opt(2025, 12, 3).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            code: 1187,
            product: "TKC110".to_string(),
            description: "Caixa".to_string(),
            quantity: 40,
        });

        let value: serde_json::Value = serde_json::from_str(&batch.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["1187"]["deliver_date"], "2025-12-03 00:00:00");
        assert_eq!(value["1187"]["code"], 1187);
        assert_eq!(value["1187"]["quantity"], 40);

        let back: OrderBatch = serde_json::from_value(value).unwrap();
        assert_eq!(back, batch);
    }
}

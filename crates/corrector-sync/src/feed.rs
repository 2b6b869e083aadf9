//! # Receipt Feed
//!
//! Historical receipts of one register for one day, pulled from the
//! OFD.ru integration API and mapped into correction receipts.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  receipts_for_day(2024-03-01)                                          │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  GET {base}/api/integration/v2/inn/{vatin}/kkt/{kkt}/receipts-info     │
//! │      ?dateFrom=2024-03-01T00:00:00&dateTo=2024-03-01T23:59:59          │
//! │      &AuthToken={token}                                                 │
//! │    │            ▲                                                       │
//! │    │  transport │ error or 5xx: exponential backoff, then retry        │
//! │    ▼            │                                                       │
//! │  parse_receipts(body) ──► Vec<Receipt> (every one a correction)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use chrono::{NaiveDate, NaiveDateTime};
use corrector_core::{
    CorrectionData, LineItem, MeasureUnit, Money, Operation, Payment, Receipt, TaxRate,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::FeedSettings;
use crate::error::{SyncError, SyncResult};

/// Timestamp layout of `DocDateTime`.
pub const DOC_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Source of receipts to replay.
#[async_trait]
pub trait ReceiptFeed: Send + Sync {
    async fn receipts_for_day(&self, day: NaiveDate) -> SyncResult<Vec<Receipt>>;
}

// =============================================================================
// Portal Payload
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReceiptsInfo {
    #[serde(default)]
    data: Vec<Option<PortalReceipt>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PortalReceipt {
    doc_number: u32,
    total_summ: Money,
    operation_type: String,
    #[serde(default)]
    cash_summ: Money,
    #[serde(default, rename = "ECashSumm")]
    ecash_summ: Money,
    #[serde(default)]
    credit_summ: Money,
    #[serde(default)]
    prepaid_summ: Money,
    #[serde(default)]
    decimal_fiscal_sign: String,
    doc_date_time: String,
    #[serde(default)]
    items: Vec<PortalItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PortalItem {
    name: String,
    price: Money,
    quantity: f64,
    total: Money,
    subject_type: u8,
    calculation_method: u8,
    #[serde(rename = "NDS_Rate")]
    nds_rate: u8,
    #[serde(default)]
    product_unit_of_measure: Option<String>,
}

// =============================================================================
// Mapping
// =============================================================================

/// Maps a `receipts-info` response body into receipts.
///
/// Null entries in `Data` are skipped. The portal does not expose the
/// original document number, so correction data carries a blank one.
pub fn parse_receipts(body: &str) -> SyncResult<Vec<Receipt>> {
    let info: ReceiptsInfo = serde_json::from_str(body)?;
    info.data.into_iter().flatten().map(map_receipt).collect()
}

fn map_receipt(raw: PortalReceipt) -> SyncResult<Receipt> {
    let document = raw.doc_number;
    let invalid = |reason: String| SyncError::InvalidReceipt { document, reason };

    let created_at = NaiveDateTime::parse_from_str(&raw.doc_date_time, DOC_DATE_TIME_FORMAT)
        .map_err(|e| invalid(format!("DocDateTime {:?}: {}", raw.doc_date_time, e)))?;

    let items = raw
        .items
        .into_iter()
        .map(|item| map_item(item).map_err(|e| invalid(e.to_string())))
        .collect::<SyncResult<Vec<_>>>()?;

    Ok(Receipt {
        document_number: document,
        total: raw.total_summ,
        items,
        payment: Payment {
            cash: raw.cash_summ,
            electronic: raw.ecash_summ,
            prepaid: raw.prepaid_summ,
            postpaid: raw.credit_summ,
            provision: Money::zero(),
        },
        operation: Operation::from_portal_name(&raw.operation_type),
        correction: Some(CorrectionData {
            created_at,
            document_id: " ".to_string(),
            fiscal_sign: raw.decimal_fiscal_sign,
        }),
    })
}

fn map_item(raw: PortalItem) -> SyncResult<LineItem> {
    let measure_unit = match raw.product_unit_of_measure.as_deref().map(str::trim) {
        None | Some("") => MeasureUnit::UNKNOWN,
        Some(code) => {
            let code = code.parse::<u8>().map_err(|_| {
                SyncError::DeserializationFailed(format!("ProductUnitOfMeasure {:?}", code))
            })?;
            MeasureUnit::from_code(code)?
        }
    };

    Ok(LineItem {
        name: raw.name,
        price: raw.price,
        quantity: raw.quantity,
        total: raw.total,
        tax_rate: TaxRate::from_ffd_code(raw.nds_rate)?,
        measure_unit,
        payment_method: raw.calculation_method,
        subject_type: raw.subject_type,
    })
}

// =============================================================================
// OFD.ru Client
// =============================================================================

/// OFD.ru integration API client.
pub struct OfdRuFeed {
    client: reqwest::Client,
    settings: FeedSettings,
}

impl OfdRuFeed {
    pub fn new(settings: FeedSettings) -> Self {
        OfdRuFeed {
            client: reqwest::Client::new(),
            settings,
        }
    }

    /// Request URL for one day.
    pub fn receipts_url(&self, day: NaiveDate) -> SyncResult<Url> {
        let mut url = Url::parse(&self.settings.base_url)?;
        url.set_path(&format!(
            "/api/integration/v2/inn/{}/kkt/{}/receipts-info",
            self.settings.vatin, self.settings.registration_id
        ));
        let day = day.format("%Y-%m-%d");
        url.query_pairs_mut()
            .append_pair("dateFrom", &format!("{day}T00:00:00"))
            .append_pair("dateTo", &format!("{day}T23:59:59"))
            .append_pair("AuthToken", &self.settings.token);
        Ok(url)
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.settings.initial_backoff_ms),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.settings.max_elapsed_secs)),
            ..Default::default()
        }
    }

    async fn fetch(&self, url: &Url) -> SyncResult<String> {
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ReceiptFeed for OfdRuFeed {
    async fn receipts_for_day(&self, day: NaiveDate) -> SyncResult<Vec<Receipt>> {
        let url = self.receipts_url(day)?;
        info!(%day, kkt = %self.settings.registration_id, "Fetching receipts from OFD.ru");

        let body = backoff::future::retry(self.create_backoff(), || async {
            self.fetch(&url).await.map_err(|e| {
                if e.is_retryable() {
                    warn!(error = %e, "OFD.ru request failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await?;

        let receipts = parse_receipts(&body)?;
        debug!(count = receipts.len(), "Receipts parsed");
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "Status": "Success",
        "Data": [
            {
                "DocNumber": 42,
                "TotalSumm": 27980,
                "OperationType": "Income",
                "CashSumm": 7980,
                "ECashSumm": 20000,
                "CreditSumm": 0,
                "PrepaidSumm": 0,
                "DecimalFiscalSign": "3451278865",
                "DocDateTime": "2024-03-01T10:15:00",
                "Items": [
                    {
                        "Name": "Milk 1L",
                        "Price": 8990,
                        "Quantity": 2.0,
                        "Total": 17980,
                        "SubjectType": 1,
                        "CalculationMethod": 4,
                        "NDS_Rate": 2,
                        "ProductUnitOfMeasure": "0"
                    },
                    {
                        "Name": "Bread",
                        "Price": 10000,
                        "Quantity": 1.0,
                        "Total": 10000,
                        "SubjectType": 1,
                        "CalculationMethod": 4,
                        "NDS_Rate": 6
                    }
                ]
            },
            null,
            {
                "DocNumber": 43,
                "TotalSumm": 500,
                "OperationType": "Refund income",
                "CashSumm": 500,
                "DecimalFiscalSign": "",
                "DocDateTime": "2024-03-01T18:00:05",
                "Items": []
            }
        ]
    }"#;

    #[test]
    fn test_parse_receipts() {
        let receipts = parse_receipts(BODY).unwrap();
        assert_eq!(receipts.len(), 2);

        let first = &receipts[0];
        assert_eq!(first.document_number, 42);
        assert_eq!(first.total, Money::from_kopecks(27_980));
        assert_eq!(first.payment.electronic, Money::from_kopecks(20_000));
        assert_eq!(first.operation, Operation::INCOME);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].tax_rate, TaxRate::Vat10);
        assert_eq!(first.items[0].measure_unit, MeasureUnit::PIECE);
        assert!(!first.items[1].measure_unit.is_known());

        let correction = first.correction.as_ref().unwrap();
        assert_eq!(correction.fiscal_sign, "3451278865");
        assert_eq!(correction.document_id, " ");
        assert_eq!(
            correction.created_at.format(DOC_DATE_TIME_FORMAT).to_string(),
            "2024-03-01T10:15:00"
        );

        let refund = &receipts[1];
        assert!(refund.operation.is_refund);
        assert!(refund.operation.is_income);
        assert!(!refund.correction.as_ref().unwrap().has_fiscal_sign());
    }

    #[test]
    fn test_bad_timestamp_names_document() {
        let body = r#"{"Data":[{"DocNumber":7,"TotalSumm":0,"OperationType":"Income",
            "DocDateTime":"01.03.2024 10:15","Items":[]}]}"#;
        match parse_receipts(body) {
            Err(SyncError::InvalidReceipt { document, .. }) => assert_eq!(document, 7),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tax_rate_rejected() {
        let body = r#"{"Data":[{"DocNumber":8,"TotalSumm":100,"OperationType":"Income",
            "DocDateTime":"2024-03-01T10:15:00","Items":[{"Name":"X","Price":100,
            "Quantity":1.0,"Total":100,"SubjectType":1,"CalculationMethod":4,"NDS_Rate":99}]}]}"#;
        assert!(matches!(
            parse_receipts(body),
            Err(SyncError::InvalidReceipt { document: 8, .. })
        ));
    }

    #[test]
    fn test_receipts_url() {
        let feed = OfdRuFeed::new(FeedSettings {
            vatin: "7700000000".into(),
            registration_id: "0000000000012345".into(),
            token: "tok".into(),
            ..FeedSettings::default()
        });
        let url = feed
            .receipts_url(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .unwrap();
        assert_eq!(
            url.path(),
            "/api/integration/v2/inn/7700000000/kkt/0000000000012345/receipts-info"
        );
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("dateFrom".to_string(), "2024-03-01T00:00:00".to_string()),
                ("dateTo".to_string(), "2024-03-01T23:59:59".to_string()),
                ("AuthToken".to_string(), "tok".to_string()),
            ]
        );
    }
}

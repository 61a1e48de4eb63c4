use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::dividends::{dates, parse_amount, DividendTransaction};
use crate::ofx::parser::SYNTHETIC_ROOT;
use crate::ofx::OfxNode;
use crate::types::{Money, NOT_AVAILABLE};

/// `INCOMETYPE` of dividend income events.
pub const DIVIDEND_INCOME_TYPE: &str = "DIV";

/// Memo marker shared by dividend events and their withholding lines.
pub const DIVIDEND_MARKER: &str = "Cash Dividend";

/// Memo marker identifying a withholding-tax bank line.
pub const WITHHOLDING_TAX_MARKER: &str = "US TAX";

/// Suffix removed from withholding memos to form the reconciliation key.
pub const WITHHOLDING_TAX_SUFFIX: &str = " - US TAX";

/// Suffix removed from dividend memos to form the reconciliation key.
pub const ORDINARY_DIVIDEND_SUFFIX: &str = " per Share (Ordinary Dividend)";

fn ticker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]+").expect("static pattern"))
}

fn per_share_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[A-Z]{3}\s+(\d+(?:\.\d+)?)\s+(?i:PER\s+SHARE)").expect("static pattern")
    })
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract dividend transactions from a parsed OFX tree.
///
/// Two passes per investment statement: withholding lines from the bank
/// transaction list are indexed by reconciliation key, then every `DIV`
/// income event is emitted with its matched withholding (zero when none
/// matched). Missing paths yield no dividends rather than an error.
pub fn extract_dividends(tree: &OfxNode) -> Vec<DividendTransaction> {
    let mut dividends = Vec::new();

    for statement in investment_statements(tree) {
        let Some(transactions) = statement.get("INVTRANLIST") else {
            continue;
        };
        let default_currency = statement.get_text("CURDEF");
        let withheld = withholding_by_key(transactions);

        for income in transactions.get_all("INCOME") {
            if income.get_text("INCOMETYPE") != Some(DIVIDEND_INCOME_TYPE) {
                continue;
            }
            dividends.push(build_dividend(income, &withheld, default_currency));
        }
    }

    debug!(count = dividends.len(), "extracted dividend transactions");
    dividends
}

/// Every `INVSTMTRS` in the document. Accepts the parser's document node,
/// a synthetic-root document, or the `OFX` element itself.
fn investment_statements(tree: &OfxNode) -> Vec<&OfxNode> {
    let ofx = tree
        .get("OFX")
        .or_else(|| tree.path(&[SYNTHETIC_ROOT, "OFX"]))
        .unwrap_or(tree);

    ofx.get_all("INVSTMTMSGSRSV1")
        .into_iter()
        .flat_map(|messages| messages.get_all("INVSTMTTRNRS"))
        .flat_map(|response| response.get_all("INVSTMTRS"))
        .collect()
}

/// First pass: withholding amounts keyed by memo with the tax suffix removed.
/// Later lines overwrite earlier ones under the same key.
fn withholding_by_key(transactions: &OfxNode) -> HashMap<String, Money> {
    let mut withheld = HashMap::new();

    for bank_line in transactions.get_all("INVBANKTRAN") {
        for line in bank_line.get_all("STMTTRN") {
            let Some(memo) = line.get_text("MEMO") else {
                continue;
            };
            if !(memo.contains(DIVIDEND_MARKER) && memo.contains(WITHHOLDING_TAX_MARKER)) {
                continue;
            }
            let amount = line
                .get_text("TRNAMT")
                .and_then(parse_amount)
                .unwrap_or(Decimal::ZERO);
            withheld.insert(reconciliation_key(memo, WITHHOLDING_TAX_SUFFIX), amount);
        }
    }

    debug!(lines = withheld.len(), "indexed withholding tax lines");
    withheld
}

fn build_dividend(
    income: &OfxNode,
    withheld: &HashMap<String, Money>,
    default_currency: Option<&str>,
) -> DividendTransaction {
    let transaction = income.get("INVTRAN");
    let field = |name: &str| transaction.and_then(|t| t.get_text(name));

    let memo = field("MEMO").unwrap_or_default();
    let id = field("FITID").unwrap_or(NOT_AVAILABLE).to_string();
    let date = field("DTTRADE")
        .and_then(dates::ofx_to_iso)
        .unwrap_or_default();

    let tax = match withheld.get(&reconciliation_key(memo, ORDINARY_DIVIDEND_SUFFIX)) {
        Some(amount) => *amount,
        None => {
            debug!(fitid = %id, "no withholding line matched dividend");
            Decimal::ZERO
        }
    };

    let currency_symbol = income
        .path(&["CURRENCY", "CURSYM"])
        .or_else(|| income.path(&["ORIGCURRENCY", "CURSYM"]))
        .and_then(OfxNode::text)
        .filter(|code| !code.is_empty())
        .or(default_currency)
        .unwrap_or(NOT_AVAILABLE)
        .to_string();

    DividendTransaction {
        id,
        date,
        ticker: ticker_from_memo(memo),
        description: memo.to_string(),
        dividend_per_share: per_share_from_memo(memo),
        total: income
            .get_text("TOTAL")
            .and_then(parse_amount)
            .unwrap_or(Decimal::ZERO),
        currency_symbol,
        tax,
        security_id: income
            .path(&["SECID", "UNIQUEID"])
            .and_then(OfxNode::text)
            .map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Memo parsing
// ---------------------------------------------------------------------------

/// Memo with the first occurrence of `suffix` removed, trimmed.
pub fn reconciliation_key(memo: &str, suffix: &str) -> String {
    memo.replacen(suffix, "", 1).trim().to_string()
}

/// Leading run of uppercase letters, `"N/A"` when the memo does not start
/// with one.
pub fn ticker_from_memo(memo: &str) -> String {
    ticker_pattern()
        .find(memo)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Amount from `"<CCY> <number> PER SHARE"`, zero when absent.
pub fn per_share_from_memo(memo: &str) -> Money {
    per_share_pattern()
        .captures(memo)
        .and_then(|caps| parse_amount(&caps[1]))
        .unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    const AAPL_DIVIDEND: &str =
        "AAPL(US0378331005) Cash Dividend USD 0.24 per Share (Ordinary Dividend)";
    const AAPL_TAX: &str = "AAPL(US0378331005) Cash Dividend USD 0.24 - US TAX";

    fn statement(list: Value) -> OfxNode {
        OfxNode::from(json!({
            "OFX": {
                "INVSTMTMSGSRSV1": {
                    "INVSTMTTRNRS": {
                        "INVSTMTRS": { "CURDEF": "USD", "INVTRANLIST": list }
                    }
                }
            }
        }))
    }

    fn income(memo: &str, fitid: &str, date: &str, total: &str) -> Value {
        json!({
            "INCOMETYPE": "DIV",
            "INVTRAN": { "MEMO": memo, "DTTRADE": date, "FITID": fitid },
            "TOTAL": total,
            "CURRENCY": { "CURSYM": "USD" }
        })
    }

    fn tax_line(memo: &str, amount: &str) -> Value {
        json!({ "STMTTRN": { "MEMO": memo, "TRNAMT": amount } })
    }

    #[test]
    fn test_extracts_reconciled_dividend() {
        let tree = statement(json!({
            "INVBANKTRAN": [tax_line(AAPL_TAX, "-3.60")],
            "INCOME": [income(AAPL_DIVIDEND, "12345", "20230216120000", "24.00")]
        }));

        let dividends = extract_dividends(&tree);

        assert_eq!(
            dividends,
            vec![DividendTransaction {
                id: "12345".into(),
                date: "2023-02-16".into(),
                ticker: "AAPL".into(),
                description: AAPL_DIVIDEND.into(),
                dividend_per_share: dec!(0.24),
                total: dec!(24.0),
                currency_symbol: "USD".into(),
                tax: dec!(-3.6),
                security_id: None,
            }]
        );
    }

    #[test]
    fn test_missing_tax_line_defaults_to_zero() {
        let tree = statement(json!({
            "INVBANKTRAN": [],
            "INCOME": [income(
                "MSFT(US5949181045) Cash Dividend USD 0.68 per Share (Ordinary Dividend)",
                "67890",
                "20230310120000",
                "68.00",
            )]
        }));

        let dividends = extract_dividends(&tree);
        assert_eq!(dividends.len(), 1);
        assert_eq!(dividends[0].tax, Decimal::ZERO);
        assert_eq!(dividends[0].dividend_per_share, dec!(0.68));
    }

    #[test]
    fn test_single_object_lists_are_accepted() {
        let tree = statement(json!({
            "INVBANKTRAN": tax_line(AAPL_TAX, "-3.60"),
            "INCOME": income(AAPL_DIVIDEND, "1", "20230216", "24.00")
        }));

        let dividends = extract_dividends(&tree);
        assert_eq!(dividends.len(), 1);
        assert_eq!(dividends[0].tax, dec!(-3.6));
    }

    #[test]
    fn test_non_dividend_income_is_skipped() {
        let mut interest = income("Interest for May", "9", "20230531", "1.25");
        interest["INCOMETYPE"] = json!("INTEREST");
        let tree = statement(json!({
            "INCOME": [interest, income(AAPL_DIVIDEND, "1", "20230216", "24.00")]
        }));

        let dividends = extract_dividends(&tree);
        assert_eq!(dividends.len(), 1);
        assert_eq!(dividends[0].id, "1");
    }

    #[test]
    fn test_memo_anomalies_resolve_to_defaults() {
        let tree = statement(json!({
            "INCOME": [{
                "INCOMETYPE": "DIV",
                "INVTRAN": { "MEMO": "12 unknown payout" },
                "TOTAL": "not a number"
            }]
        }));

        let dividend = &extract_dividends(&tree)[0];
        assert_eq!(dividend.id, NOT_AVAILABLE);
        assert_eq!(dividend.ticker, NOT_AVAILABLE);
        assert_eq!(dividend.dividend_per_share, Decimal::ZERO);
        assert_eq!(dividend.total, Decimal::ZERO);
        assert_eq!(dividend.date, "");
        // falls back to the statement's default currency
        assert_eq!(dividend.currency_symbol, "USD");
    }

    #[test]
    fn test_duplicate_tax_keys_last_seen_wins() {
        let tree = statement(json!({
            "INVBANKTRAN": [tax_line(AAPL_TAX, "-3.60"), tax_line(AAPL_TAX, "-1.20")],
            "INCOME": [income(AAPL_DIVIDEND, "1", "20230216", "24.00")]
        }));

        assert_eq!(extract_dividends(&tree)[0].tax, dec!(-1.2));
    }

    #[test]
    fn test_lines_without_both_markers_are_ignored() {
        let tree = statement(json!({
            "INVBANKTRAN": [
                tax_line("AAPL(US0378331005) Cash Dividend USD 0.24", "-9.99"),
                tax_line("Monthly fee - US TAX", "-1.00")
            ],
            "INCOME": [income(AAPL_DIVIDEND, "1", "20230216", "24.00")]
        }));

        assert_eq!(extract_dividends(&tree)[0].tax, Decimal::ZERO);
    }

    #[test]
    fn test_missing_paths_yield_nothing() {
        assert!(extract_dividends(&OfxNode::from(json!({}))).is_empty());
        assert!(extract_dividends(&OfxNode::from(json!({ "OFX": { "SIGNONMSGSRSV1": {} } })))
            .is_empty());
        assert!(extract_dividends(&OfxNode::Leaf("text".into())).is_empty());
    }

    #[test]
    fn test_every_statement_is_read() {
        let account = |fitid: &str| {
            json!({
                "INVSTMTRS": {
                    "INVTRANLIST": { "INCOME": income(AAPL_DIVIDEND, fitid, "20230216", "1") }
                }
            })
        };
        let tree = OfxNode::from(json!({
            "OFX": { "INVSTMTMSGSRSV1": { "INVSTMTTRNRS": [account("A"), account("B")] } }
        }));

        let ids: Vec<String> = extract_dividends(&tree).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_security_id_is_carried() {
        let mut event = income(AAPL_DIVIDEND, "1", "20230216", "24.00");
        event["SECID"] = json!({ "UNIQUEID": "US0378331005", "UNIQUEIDTYPE": "ISIN" });
        let tree = statement(json!({ "INCOME": event }));

        assert_eq!(
            extract_dividends(&tree)[0].security_id.as_deref(),
            Some("US0378331005")
        );
    }

    #[test]
    fn test_memo_helpers() {
        assert_eq!(ticker_from_memo("BRK B dividend"), "BRK");
        assert_eq!(ticker_from_memo("aapl"), NOT_AVAILABLE);
        assert_eq!(per_share_from_memo("Cash Dividend EUR 1.5 PER SHARE"), dec!(1.5));
        assert_eq!(per_share_from_memo("Cash Dividend USD 2 per share"), dec!(2));
        assert_eq!(per_share_from_memo("Cash Dividend"), Decimal::ZERO);
        assert_eq!(per_share_from_memo("Cash Dividend usd 2 per share"), Decimal::ZERO);
        assert_eq!(
            reconciliation_key(AAPL_TAX, WITHHOLDING_TAX_SUFFIX),
            reconciliation_key(AAPL_DIVIDEND, ORDINARY_DIVIDEND_SUFFIX)
        );
    }
}

//! Research taxonomy
//!
//! The fixed set of research categories and their subtopic queries.
//! Taxonomy is configuration data: read-only, shared, process-wide.
//! Categories and subtopics are always processed in declaration order.

use lazy_static::lazy_static;

/// One named research topic with its ordered subtopic query fragments.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub subtopics: Vec<String>,
}

impl Category {
    pub fn new(name: &str, subtopics: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            subtopics: subtopics.iter().map(|s| s.to_string()).collect(),
        }
    }
}

lazy_static! {
    /// The default process-wide taxonomy.
    pub static ref TAXONOMY: Vec<Category> = default_taxonomy();
}

fn default_taxonomy() -> Vec<Category> {
    vec![
        Category::new("1_business_fundamentals_and_model_stability", &[
            "core business description and primary value proposition",
            "segment-wise revenue and profit breakdown (product, geography, customer type)",
            "revenue concentration — top customers >10% share, stability of key contracts",
            "business model repeatability — recurring vs transactional revenue proportion",
            "competitive landscape — primary competitors, differentiation factors",
            "industry structure and cyclicality (barriers to entry, supplier/customer power)",
        ]),
        Category::new("2_financial_strength_and_quality_of_earnings", &[
            "5-year trend — revenue, EBITDA, operating profit, PAT",
            "cash flow consistency — CFO vs PAT comparison, FCF sustainability",
            "ROE, ROCE, ROA — trend and consistency vs industry averages",
            "margin stability — gross, operating, net margins over 5 years",
            "quality of earnings — one-offs, restatements, extraordinary items",
            "working capital cycle efficiency — receivable days, inventory, payables trend",
        ]),
        Category::new("3_balance_sheet_health_and_liquidity", &[
            "debt-to-equity ratio, interest coverage ratio, leverage trend",
            "cash and liquid assets vs short-term obligations",
            "capital expenditure trend — maintenance vs growth capex",
            "contingent liabilities, off-balance sheet exposures, guarantees",
            "credit ratings (if available), debt maturity profile",
        ]),
        Category::new("4_intrinsic_value_and_market_positioning", &[
            "current market price, market cap, enterprise value, valuation timestamp",
            "analyst target price range, consensus valuation estimates",
            "institutional holding trend — top holders, changes over last 4 quarters",
            "DCF or comparable-based fair value estimation (P/E, EV/EBITDA, P/B)",
            "valuation premium/discount vs historical and sector averages",
        ]),
        Category::new("5_economic_moat_and_durability", &[
            "sources of moat — brand equity, IP, patents, regulatory licenses, switching costs",
            "evidence of pricing power — gross margin resilience, market share stability",
            "distribution advantages, customer loyalty indicators, renewal rates",
            "network effects, ecosystem lock-ins, data advantage",
            "moat sustainability — evidence of erosion or strengthening",
        ]),
        Category::new("6_management_integrity_and_capital_allocation", &[
            "key management bios — track record, tenure, competence",
            "insider ownership and recent insider trading (buy/sell trends)",
            "capital allocation track record — acquisitions, buybacks, dividends, debt repayment",
            "governance indicators — board independence, audit quality, disclosures",
            "transparency — investor communication, accounting conservatism",
        ]),
        Category::new("7_growth_drivers_and_future_visibility", &[
            "strategic initiatives — expansion plans, R&D, product pipeline, partnerships",
            "industry growth projections and tailwinds (sources: McKinsey, CRISIL, IBIS, etc.)",
            "company's growth guidance vs historical delivery rate",
            "long-term scalability and reinvestment opportunities",
            "technological disruption risk — readiness for innovation",
        ]),
        Category::new("8_macro_and_regional_sensitivity", &[
            "dependence on domestic vs export markets, FX sensitivity",
            "regulatory dependencies, policy changes, taxation impact",
            "economic cyclicality exposure (interest rate, commodity price linkages)",
            "country risk, trade barriers, geopolitical exposure",
        ]),
        Category::new("9_behavioral_and_market_sentiment", &[
            "12-month major news — litigation, fraud, leadership change, contracts won/lost",
            "analyst rating distribution and changes",
            "short interest, retail sentiment (social chatter, trend spikes)",
            "FII/DII flow trends and volatility of institutional confidence",
        ]),
        Category::new("10_risks_and_downside_scenarios", &[
            "structural industry risks — technology obsolescence, policy threats",
            "execution risks — management capability, delays in capex or product rollout",
            "financial risks — leverage, liquidity crunch, credit events",
            "governance or compliance risks — audit issues, insider conflicts",
            "fraud/malpractice indicators — investigations, whistleblower complaints",
        ]),
        Category::new("11_integrity_and_governance_health", &[
            "related-party transactions, promoter pledging trends",
            "corporate governance ratings (if any), regulatory penalties or SEBI actions",
            "litigation record and material legal exposures",
            "ESG disclosures, environmental or social controversies",
        ]),
        Category::new("12_overall_fundamental_conviction_score", &[
            "stability across cycles — earnings resilience in past downturns",
            "cash flow predictability and margin durability",
            "management credibility and governance trust level",
            "valuation comfort vs fundamentals",
            "net upside-to-risk trade-off — prudent Buy/Avoid recommendation basis",
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_taxonomy_shape() {
        assert_eq!(TAXONOMY.len(), 12);
        for category in TAXONOMY.iter() {
            assert!(!category.subtopics.is_empty(), "{}", category.name);
        }
    }

    #[test]
    fn test_declaration_order_is_stable() {
        assert_eq!(
            TAXONOMY[0].name,
            "1_business_fundamentals_and_model_stability"
        );
        assert_eq!(TAXONOMY[11].name, "12_overall_fundamental_conviction_score");
    }
}

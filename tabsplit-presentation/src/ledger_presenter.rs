use crate::format_signed;
use std::fmt::Write as _;
use tabsplit_application::LedgerReport;
use tabsplit_domain::{MemberBalances, SettlementTransaction};

pub struct LedgerPresenter;

impl LedgerPresenter {
    pub fn render(report: &LedgerReport) -> String {
        let mut reply = String::with_capacity(512);

        reply.push_str("Balances\n");
        reply.push_str(&Self::render_balances(&report.balances));

        if report.is_settled() {
            reply.push_str("All settled up.\n");
        } else {
            reply.push_str("Suggested payments\n");
            reply.push_str(&Self::render_suggestions(&report.suggestions));
        }

        if !report.diagnostics.is_empty() {
            let _ = writeln!(&mut reply, "Skipped records ({})", report.diagnostics.len());
            for diagnostic in &report.diagnostics {
                let _ = writeln!(&mut reply, "- {diagnostic}");
            }
        }

        reply
    }

    pub fn render_balances(balances: &MemberBalances) -> String {
        if balances.is_empty() {
            return "  [no members]\n".to_owned();
        }

        let width = balances
            .keys()
            .map(|member| member.as_str().chars().count())
            .max()
            .unwrap_or(0);
        let mut reply = String::new();
        for (member, balance) in balances {
            let _ = writeln!(
                &mut reply,
                "  {:<width$}  {:>10}",
                member.as_str(),
                format_signed(*balance)
            );
        }
        reply
    }

    pub fn render_suggestions(suggestions: &[SettlementTransaction]) -> String {
        let mut reply = String::new();
        for transaction in suggestions {
            let _ = writeln!(
                &mut reply,
                "  {} pays {} {}",
                transaction.from, transaction.to, transaction.amount
            );
        }
        reply
    }
}

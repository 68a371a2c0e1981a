use std::fmt::Write as _;
use tabsplit_domain::{Money, SplitShares};

pub struct SplitPresenter;

impl SplitPresenter {
    /// Lists each share followed by the total, e.g. for an equal-split preview.
    pub fn render(amount: Money, shares: &SplitShares) -> String {
        let width = shares
            .members()
            .map(|member| member.as_str().chars().count())
            .max()
            .unwrap_or(0)
            .max("total".len());

        let mut reply = String::with_capacity(32 * (shares.len() + 1));
        for (member, share) in shares.iter() {
            let _ = writeln!(
                &mut reply,
                "  {:<width$}  {:>10}",
                member.as_str(),
                share.to_string()
            );
        }
        let _ = writeln!(&mut reply, "  {:<width$}  {:>10}", "total", amount.to_string());
        reply
    }
}

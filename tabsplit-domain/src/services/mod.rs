pub mod balance_calculator;
pub mod settlement_planner;
pub mod split_validator;

pub use balance_calculator::{
    BalanceAccumulator, BalanceCalculator, BalanceReport, apply_settlements, compute_balances,
};
pub use settlement_planner::{SettlementPlanner, suggest_settlements};
pub use split_validator::{SplitValidator, equal_split, validate_split};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Tunable money-policy constants. Defaults match the production values:
/// KSh 1000 activation fee, KSh 50 referral bonus, KSh 100 referral-wallet
/// withdrawal minimum, 30-day earnings withdrawal cooldown.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub activation_fee: Decimal,
    pub referral_bonus: Decimal,
    pub referral_withdrawal_min: Decimal,
    pub earnings_withdrawal_cooldown_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activation_fee: dec!(1000),
            referral_bonus: dec!(50),
            referral_withdrawal_min: dec!(100),
            earnings_withdrawal_cooldown_days: 30,
        }
    }
}

use {super::error::AppError, serde::Deserialize, std::fmt};

/// Upper bound mirrors the DECIMAL(10, 2) column the records live in.
const MAX_CENTS: i64 = 99_999_999_99;

/// Positive USD amount in whole cents. Fixed at record creation and never
/// mutated afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UsdAmount(i64);

impl UsdAmount {
    pub fn from_cents(cents: i64) -> Result<Self, AppError> {
        if cents < 1 {
            return Err(AppError::Validation(
                "amount must be at least $0.01".into(),
            ));
        }
        if cents > MAX_CENTS {
            return Err(AppError::Validation(format!(
                "amount exceeds maximum, got {cents} cents"
            )));
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Parse a decimal dollar string ("25", "25.5", "25.00").
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let s = raw.trim();
        let bad = || AppError::Validation(format!("invalid amount: {raw:?}"));

        let (dollars, fraction) = match s.split_once('.') {
            Some((d, f)) if !f.is_empty() => (d, f),
            Some(_) => return Err(bad()),
            None => (s, ""),
        };
        if dollars.is_empty() && fraction.is_empty() {
            return Err(bad());
        }
        if !dollars.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
            || fraction.len() > 2
        {
            return Err(bad());
        }

        let whole: i64 = if dollars.is_empty() {
            0
        } else {
            dollars.parse().map_err(|_| bad())?
        };
        let cents_part: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| bad())? * 10,
            _ => fraction.parse().map_err(|_| bad())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents_part))
            .ok_or_else(bad)?;
        Self::from_cents(cents)
    }

    /// Total for `quantity` units priced at `self`.
    pub fn times(self, quantity: u32) -> Result<Self, AppError> {
        let total = self
            .0
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| AppError::Validation("amount overflow".into()))?;
        Self::from_cents(total)
    }
}

/// Renders as a dollar string ("25.00") — the form both the public API and
/// the gateway wire format use.
impl fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Request bodies may carry the amount as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    pub fn into_amount(self) -> Result<UsdAmount, AppError> {
        match self {
            AmountInput::Text(s) => UsdAmount::parse(&s),
            AmountInput::Number(n) => {
                if !n.is_finite() || n <= 0.0 || n > MAX_CENTS as f64 / 100.0 {
                    return Err(AppError::Validation(format!("invalid amount: {n}")));
                }
                UsdAmount::from_cents((n * 100.0).round() as i64)
            }
        }
    }
}

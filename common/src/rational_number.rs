use anyhow::{anyhow, bail, Result};

pub type RationalNumber = num_rational::Ratio<u64>;

/// Parse a non-negative decimal such as `"43.946"` exactly, without going through floats
pub fn rational_number_from_decimal(text: &str) -> Result<RationalNumber> {
    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() && fraction.is_empty() {
        bail!("Empty decimal");
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        bail!("Cannot convert {text} to Rational");
    }

    let denominator = 10u64
        .checked_pow(fraction.len() as u32)
        .ok_or_else(|| anyhow!("Too many decimal places in {text}"))?;
    let digits = format!("{whole}{fraction}");
    let numerator: u64 =
        digits.parse().map_err(|e| anyhow!("Cannot convert {text} to Rational: {e}"))?;
    Ok(RationalNumber::new(numerator, denominator))
}

// storefront/src/models/mod.rs

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

/// Renders minor units with two decimals, e.g. `123456` → `"1234.56"`.
pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parses a decimal amount with at most two fraction digits into minor units.
pub fn parse_cents(amount: &str) -> Option<i64> {
  let amount = amount.trim();
  let (whole, fraction) = match amount.split_once('.') {
    Some((w, f)) => (w, f),
    None => (amount, ""),
  };
  if whole.is_empty() || fraction.len() > 2 || !whole.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  if !fraction.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  let whole: i64 = whole.parse().ok()?;
  let fraction: i64 = match fraction.len() {
    0 => 0,
    1 => fraction.parse::<i64>().ok()? * 10,
    _ => fraction.parse().ok()?,
  };
  whole.checked_mul(100)?.checked_add(fraction)
}

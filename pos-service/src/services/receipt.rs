//! Plain-text receipt for 40-column thermal printers.

use std::fmt;

use crate::models::{Bill, UserDetails, DEFAULT_PAYMENT_MODE};
use crate::utils::ShopClock;

const WIDTH: usize = 40;

pub struct Receipt<'a> {
    pub shop: &'a UserDetails,
    pub bill: &'a Bill,
    pub clock: &'a ShopClock,
}

fn centered(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    if text.trim().is_empty() {
        return Ok(());
    }
    writeln!(f, "{:^width$}", text.trim(), width = WIDTH)
}

fn rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "-".repeat(WIDTH))
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

impl fmt::Display for Receipt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        centered(f, &self.shop.shop_name)?;
        centered(f, &self.shop.address)?;
        if !self.shop.phone.trim().is_empty() {
            centered(f, &format!("Ph: {}", self.shop.phone.trim()))?;
        }
        rule(f)?;

        writeln!(f, "Bill No: {}", self.bill.id)?;
        writeln!(f, "Date: {}", self.clock.format(self.bill.created_at))?;
        rule(f)?;

        writeln!(f, "{:<20}{:>4}{:>8}{:>8}", "Item", "Qty", "Rate", "Amount")?;
        for item in &self.bill.items {
            writeln!(
                f,
                "{:<20}{:>4}{:>8.2}{:>8.2}",
                truncate(&item.name, 19),
                item.quantity,
                item.unit_price,
                item.line_total
            )?;
        }
        rule(f)?;

        writeln!(f, "{:<24}{:>16.2}", "TOTAL", self.bill.total)?;
        writeln!(
            f,
            "{:<24}{:>16}",
            "Paid by",
            self.bill.payment_mode.as_deref().unwrap_or(DEFAULT_PAYMENT_MODE)
        )?;
        rule(f)?;
        centered(f, "Thank you! Visit again")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    #[test]
    fn receipt_lists_items_and_total() {
        let shop = UserDetails {
            shop_name: "Annapoorna".to_string(),
            phone: "98400 00000".to_string(),
            address: String::new(),
        };
        let mut bill = Bill::new(
            1_000_000_001,
            vec![
                LineItem::new("Tea".to_string(), 2, Decimal::from(10), None).unwrap(),
                LineItem::new("Masala Dosa with extra chutney".to_string(), 1, Decimal::from(60), None)
                    .unwrap(),
            ],
            Decimal::from(80),
            None,
        );
        bill.created_at = DateTime::parse_from_rfc3339("2024-03-01T04:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = ShopClock::from_offset_minutes(Some(330));

        let text = Receipt { shop: &shop, bill: &bill, clock: &clock }.to_string();

        assert!(text.contains("Annapoorna"));
        assert!(text.contains("Ph: 98400 00000"));
        assert!(text.contains("Bill No: 1000000001"));
        assert!(text.contains("Date: 01/03/2024, 10:00:00"));
        // 19 characters of name, a separating space, then the quantity column.
        assert!(text.contains("Masala Dosa with ex    1"));
        assert!(!text.contains("Masala Dosa with ext"));
        assert!(text.contains("80.00"));
        assert!(text.contains("Cash"));
        assert!(text.lines().all(|line| line.chars().count() <= WIDTH));
    }
}

//! Checkout via messaging: price a single-product order for a delivery region
//! and compose the message the customer sends to the merchant.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::{Error, Result, delivery};

/// Merchant details printed into every checkout message.
#[derive(Debug, Clone)]
pub struct MerchantContact {
  pub store_name:           String,
  /// International format without `+`, e.g. `254112327141`.
  pub whatsapp_number:      String,
  pub payment_instructions: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
  pub product_name:  String,
  pub price:         f64,
  pub region:        String,
  pub customer_name: String,
  pub phone:         String,
  #[serde(default)]
  pub email:         Option<String>,
  #[serde(default)]
  pub notes:         Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
  pub region:       &'static str,
  pub subtotal:     f64,
  pub delivery_fee: u32,
  pub total:        f64,
  pub message:      String,
  pub whatsapp_url: String,
}

pub fn quote(req: &QuoteRequest, merchant: &MerchantContact) -> Result<Quote> {
  for (field, value) in [
    ("productName", &req.product_name),
    ("region", &req.region),
    ("customerName", &req.customer_name),
    ("phone", &req.phone),
  ] {
    if value.trim().is_empty() {
      return Err(Error::missing_field(field));
    }
  }
  if !req.price.is_finite() || req.price < 0.0 {
    return Err(Error::Validation("price must be a non-negative number".to_owned()));
  }
  let region = delivery::find(&req.region)
    .ok_or_else(|| Error::Validation(format!("Unknown delivery region: {}", req.region.trim())))?;

  let total = req.price + f64::from(region.charge);
  let fee = if region.charge == 0 {
    "FREE".to_owned()
  } else {
    format!("KSh {}", ksh(f64::from(region.charge)))
  };
  let optional = |v: &Option<String>, fallback: &str| {
    v.as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .unwrap_or(fallback)
      .to_owned()
  };

  let message = format!(
    "🛍️ *New Order from {store}*\n\n\
     📦 *Product:* {product}\n\
     💰 *Price:* KSh {price}\n\
     🚚 *Delivery Fee:* {fee}\n\
     💳 *Total:* KSh {total}\n\n\
     👤 *Customer Details:*\n\
     • Name: {name}\n\
     • Phone: {phone}\n\
     • Email: {email}\n\
     • Location: {location}\n\n\
     📝 *Additional Notes:*\n\
     {notes}\n\n\
     💳 *Payment:* {payment}",
    store = merchant.store_name,
    product = req.product_name.trim(),
    price = ksh(req.price),
    total = ksh(total),
    name = req.customer_name.trim(),
    phone = req.phone.trim(),
    email = optional(&req.email, "Not provided"),
    location = region.name,
    notes = optional(&req.notes, "None"),
    payment = merchant.payment_instructions,
  );

  let text: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
  let whatsapp_url = format!(
    "https://wa.me/{}?text={text}",
    merchant.whatsapp_number.trim_start_matches('+'),
  );

  Ok(Quote {
    region: region.name,
    subtotal: req.price,
    delivery_fee: region.charge,
    total,
    message,
    whatsapp_url,
  })
}

/// Format an amount with thousands separators; fractional amounts keep two
/// decimals.
fn ksh(amount: f64) -> String {
  let cents = (amount * 100.0).round() as i64;
  let (whole, frac) = (cents / 100, cents % 100);
  let digits = whole.to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }
  if frac == 0 { grouped } else { format!("{grouped}.{frac:02}") }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn merchant() -> MerchantContact {
    MerchantContact {
      store_name:           "Duka".to_owned(),
      whatsapp_number:      "+254112327141".to_owned(),
      payment_instructions: "M-Pesa Paybill 247247".to_owned(),
    }
  }

  fn request(region: &str) -> QuoteRequest {
    QuoteRequest {
      product_name:  "Silk robe".to_owned(),
      price:         4500.0,
      region:        region.to_owned(),
      customer_name: "Jane".to_owned(),
      phone:         "+254700000000".to_owned(),
      email:         None,
      notes:         Some("  ".to_owned()),
    }
  }

  #[test]
  fn quote_adds_region_fee() {
    let q = quote(&request("Karen"), &merchant()).unwrap();
    assert_eq!(q.delivery_fee, 500);
    assert_eq!(q.total, 5000.0);
    assert!(q.message.contains("*Total:* KSh 5,000"));
    assert!(q.message.contains("Email: Not provided"));
    assert!(q.message.contains("*Additional Notes:*\nNone"));
  }

  #[test]
  fn pickup_is_marked_free() {
    let q = quote(&request("pickup shelf"), &merchant()).unwrap();
    assert_eq!(q.region, "Pickup Shelf");
    assert!(q.message.contains("*Delivery Fee:* FREE"));
  }

  #[test]
  fn link_targets_merchant_with_encoded_text() {
    let q = quote(&request("Karen"), &merchant()).unwrap();
    assert!(q.whatsapp_url.starts_with("https://wa.me/254112327141?text="));
    let text = q.whatsapp_url.split_once("?text=").unwrap().1;
    assert!(!text.contains(' ') && !text.contains('\n') && !text.contains('&'));

    let query = format!("text={text}");
    let decoded: Vec<_> = form_urlencoded::parse(query.as_bytes()).collect();
    assert_eq!(decoded[0].1, q.message);
  }

  #[test]
  fn unknown_region_is_rejected() {
    let err = quote(&request("Atlantis"), &merchant()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn blank_phone_is_rejected() {
    let mut req = request("Karen");
    req.phone = " ".to_owned();
    let err = quote(&req, &merchant()).unwrap_err();
    assert_eq!(err.to_string(), "Missing required field: phone");
  }

  #[test]
  fn ksh_groups_thousands() {
    assert_eq!(ksh(0.0), "0");
    assert_eq!(ksh(999.0), "999");
    assert_eq!(ksh(1000.0), "1,000");
    assert_eq!(ksh(1234567.5), "1,234,567.50");
  }
}

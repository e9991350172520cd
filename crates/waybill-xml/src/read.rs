//! Event-driven extraction of order records from an XML document.
//!
//! Pipeline:
//!   raw &str
//!     └─ OrderReader (quick-xml event loop)
//!          └─ OrderDraft / LineItemDraft accumulation
//!               └─ build() → Order (presence + numeric validation)

use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};
use rust_decimal::Decimal;
use waybill_core::order::{Customer, LineItem, Order};

use crate::error::{Error, Result};

// ─── Reader ──────────────────────────────────────────────────────────────────

/// A lazy, single-pass sequence of orders found anywhere in a document.
///
/// Every `order` element yields one item, in document order. The sequence is
/// not restartable: once it has yielded an error or reached the end of the
/// document, it stays exhausted.
pub struct OrderReader<'a> {
  reader: Reader<&'a [u8]>,
  done:   bool,
}

impl<'a> OrderReader<'a> {
  pub fn new(document: &'a str) -> Self {
    Self {
      reader: Reader::from_str(document),
      done:   false,
    }
  }

  /// Consume the subtree of one `order` element (the start tag has already
  /// been read) and build an [`Order`] from it.
  fn read_order(&mut self) -> Result<Order> {
    let mut draft = OrderDraft::default();
    // element path relative to the order element
    let mut path: Vec<String> = Vec::new();

    loop {
      match self
        .reader
        .read_event()
        .map_err(|e| Error::Xml(e.to_string()))?
      {
        Event::Start(e) => {
          let name = local_name(&e);
          if path.is_empty() && name == "product" {
            draft.items.push(LineItemDraft::default());
          }
          path.push(name);
          // a field element that is present but empty still counts as present
          if let Some(slot) = draft.slot(&path) {
            slot.get_or_insert_with(String::new);
          }
        }
        Event::Empty(e) => {
          let name = local_name(&e);
          if path.is_empty() && name == "product" {
            draft.items.push(LineItemDraft::default());
          } else {
            path.push(name);
            if let Some(slot) = draft.slot(&path) {
              slot.get_or_insert_with(String::new);
            }
            path.pop();
          }
        }
        Event::Text(e) => {
          if let Some(slot) = draft.slot(&path) {
            let text = e.unescape().map_err(|e| Error::Xml(e.to_string()))?;
            slot.get_or_insert_with(String::new).push_str(&text);
          }
        }
        Event::CData(e) => {
          if let Some(slot) = draft.slot(&path) {
            slot
              .get_or_insert_with(String::new)
              .push_str(&String::from_utf8_lossy(&e.into_inner()));
          }
        }
        Event::End(_) => {
          if path.pop().is_none() {
            // closed the order element itself
            return draft.build();
          }
        }
        Event::Eof => {
          return Err(Error::Xml(
            "unexpected end of document inside order element".into(),
          ));
        }
        _ => {}
      }
    }
  }
}

impl Iterator for OrderReader<'_> {
  type Item = Result<Order>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    loop {
      match self.reader.read_event() {
        Ok(Event::Start(e)) if local_name(&e) == "order" => {
          let order = self.read_order();
          if order.is_err() {
            self.done = true;
          }
          return Some(order);
        }
        Ok(Event::Empty(e)) if local_name(&e) == "order" => {
          // an empty order element has every required field missing
          self.done = true;
          return Some(OrderDraft::default().build());
        }
        Ok(Event::Eof) => {
          self.done = true;
          return None;
        }
        Ok(_) => {}
        Err(e) => {
          self.done = true;
          return Some(Err(Error::Xml(e.to_string())));
        }
      }
    }
  }
}

fn local_name(e: &BytesStart<'_>) -> String {
  String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

// ─── Accumulators ────────────────────────────────────────────────────────────

#[derive(Default)]
struct OrderDraft {
  id:       Option<String>,
  reg_date: Option<String>,
  sum:      Option<String>,
  fio:      Option<String>,
  email:    Option<String>,
  items:    Vec<LineItemDraft>,
}

#[derive(Default)]
struct LineItemDraft {
  quantity: Option<String>,
  name:     Option<String>,
  price:    Option<String>,
}

impl OrderDraft {
  /// The text slot addressed by an element path, if it is a recognized
  /// order field. Unrecognized elements are skipped.
  fn slot(&mut self, path: &[String]) -> Option<&mut Option<String>> {
    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
    match segments.as_slice() {
      ["no"] => Some(&mut self.id),
      ["reg_date"] => Some(&mut self.reg_date),
      ["sum"] => Some(&mut self.sum),
      ["user", "fio"] => Some(&mut self.fio),
      ["user", "email"] => Some(&mut self.email),
      ["product", "quantity"] => self.items.last_mut().map(|i| &mut i.quantity),
      ["product", "name"] => self.items.last_mut().map(|i| &mut i.name),
      ["product", "price"] => self.items.last_mut().map(|i| &mut i.price),
      _ => None,
    }
  }

  fn build(self) -> Result<Order> {
    let id = parse_int("no", self.id)?;
    let registration_date = require("reg_date", self.reg_date)?;
    let total_cost = parse_decimal("sum", self.sum)?;
    let customer = Customer {
      full_name: require("user/fio", self.fio)?,
      email:     require("user/email", self.email)?,
    };

    let mut line_items = Vec::with_capacity(self.items.len());
    for item in self.items {
      let quantity = parse_int("quantity", item.quantity)?;
      let product_name = require("name", item.name)?;
      let unit_price = parse_decimal("price", item.price)?;
      line_items.push(LineItem {
        product_name,
        unit_price,
        quantity,
      });
    }

    Ok(Order {
      id,
      registration_date,
      total_cost,
      customer,
      line_items,
    })
  }
}

// ─── Field conversion ────────────────────────────────────────────────────────

fn require(field: &'static str, value: Option<String>) -> Result<String> {
  value.ok_or(Error::MissingField(field))
}

/// Numeric fields tolerate surrounding whitespace but nothing else locale
/// could add: a plain decimal point, no grouping separators.
fn parse_int(field: &'static str, value: Option<String>) -> Result<i64> {
  let raw = require(field, value)?;
  raw
    .trim()
    .parse()
    .map_err(|_| Error::InvalidNumber { field, value: raw })
}

fn parse_decimal(field: &'static str, value: Option<String>) -> Result<Decimal> {
  let raw = require(field, value)?;
  raw
    .trim()
    .parse()
    .map_err(|_| Error::InvalidNumber { field, value: raw })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

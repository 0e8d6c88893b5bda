// src/record.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synthetic product records and their row layout

use rand::Rng;

use crate::constants::*;
use crate::error::WriterError;
use crate::writer::{Align, Cell, CellStyle, Column, SpreadsheetSink, StyleId};

/// Column titles, in row order
pub const HEADER: [&str; 4] = ["Code", "Name", "Description", "Price"];

/// Display widths for the header columns
const COLUMN_WIDTHS: [f64; 4] = [20.0, 30.0, 30.0, 30.0];

/// One generated product. Built, handed to the writer, dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    /// 8-digit zero-padded number below 400
    pub code: String,
    pub name: String,
    pub description: String,
    /// In [0, 1000)
    pub price: f64,
}

impl ProductRecord {
    /// Draw one record from `rng`
    ///
    /// Draw order is fixed (code, name, description, whole price, fraction),
    /// so a seeded generator always yields the same sequence.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let code = format!(
            "{:0width$}",
            rng.random_range(0..CODE_UPPER_BOUND),
            width = CODE_WIDTH
        );
        let name = format!("Product {}", rng.random_range(0..LABEL_UPPER_BOUND));
        let description = format!(
            "Description of product {}",
            rng.random_range(0..LABEL_UPPER_BOUND)
        );
        let whole = rng.random_range(0..PRICE_WHOLE_UPPER_BOUND);
        let fraction: f64 = rng.random();

        Self {
            code,
            name,
            description,
            price: f64::from(whole) + fraction,
        }
    }

    /// Consume the record into typed cells: three text cells and a number
    pub fn into_cells(self, styles: &RowStyles) -> [Cell; 4] {
        [
            Cell::new(self.code, styles.code),
            Cell::new(self.name, styles.text),
            Cell::new(self.description, styles.text),
            Cell::new(self.price, styles.price),
        ]
    }
}

/// Style ids used for every header and data row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStyles {
    pub header: StyleId,
    pub code: StyleId,
    pub text: StyleId,
    pub price: StyleId,
}

impl RowStyles {
    /// Register the grey-font styles on `sink`
    ///
    /// Codes are centered text, names and descriptions fill their cell, and
    /// prices are right-aligned with two decimals.
    pub fn register<S: SpreadsheetSink + ?Sized>(sink: &mut S) -> Result<Self, WriterError> {
        let base = CellStyle::new().font_color(CELL_FONT_COLOR);
        let header = sink.add_style(&base)?;
        let code = sink.add_style(
            &base
                .clone()
                .number_format(CODE_NUMBER_FORMAT)
                .align(Align::Center),
        )?;
        let text = sink.add_style(&base.clone().align(Align::Fill))?;
        let price = sink.add_style(
            &base
                .number_format(PRICE_NUMBER_FORMAT)
                .align(Align::Right),
        )?;
        Ok(Self {
            header,
            code,
            text,
            price,
        })
    }

    /// Every cell unstyled
    pub fn plain() -> Self {
        Self {
            header: StyleId::DEFAULT,
            code: StyleId::DEFAULT,
            text: StyleId::DEFAULT,
            price: StyleId::DEFAULT,
        }
    }

    pub fn header_columns(&self) -> Vec<Column> {
        HEADER
            .iter()
            .zip(COLUMN_WIDTHS)
            .map(|(label, width)| Column::new(*label, self.header).with_width(width))
            .collect()
    }
}

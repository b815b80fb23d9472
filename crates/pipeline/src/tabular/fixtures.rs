//! Workbook fixtures for spreadsheet import tests.

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

pub const XLSX_MEDIA_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A one-sheet xlsx with text, integer, float, boolean and date columns.
pub fn orders_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let sheet = workbook.add_worksheet();

    for (col, header) in ["Region", "Units Sold", "Price ($)", "Active", "Order Date"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }

    let rows = [
        ("North", 3.0, 9.99, true, (2024, 1, 1)),
        ("South", 5.0, 10.0, false, (2024, 2, 15)),
        ("East", 7.0, 12.5, true, (2024, 3, 31)),
    ];
    for (i, (region, units, price, active, (y, m, d))) in rows.into_iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, region).unwrap();
        sheet.write_number(row, 1, units).unwrap();
        sheet.write_number(row, 2, price).unwrap();
        sheet.write_boolean(row, 3, active).unwrap();
        let date = ExcelDateTime::from_ymd(y, m, d).unwrap();
        sheet.write_datetime_with_format(row, 4, &date, &date_format).unwrap();
    }

    workbook.save_to_buffer().unwrap()
}

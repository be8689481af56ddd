/*!

This is the long-form manual for `attendance_core` and `attnhl`.

## Table layout

The reports start with a few metadata rows (institution, semester, dates). They are dropped:
the number of rows to drop is `headerSkipCount` in the configuration (5 by default). The next
row is the header. Every following row is a student.

The header has one label per subject, on the first column of its block:

```text
S.No | Enroll | Name | DBMS |   |      | CN |   |      |     |   |      | TOTAL
     |        |      | 30   | 28| 93.3 | 20 | 19| 95   | 5   | 4 | 80   | 90.1
```

- `DBMS` only has theory sessions: total, attended and percentage are the columns 3, 4 and 5.
- `CN` has theory and lab sessions. The theory block is 7, 8 and 9. The column 10 has no
  label (the cell was merged with `CN` in the original document), so the lab block is 10,
  11 and 12.

Blank labels and labels starting with `Unnamed` (written by dataframe exports for blank
header cells) both count as merged cells.

## Requests

- `subject`: the label of the subject, case-insensitive. `TOTAL` selects the last column of
  the table, whatever its label.
- `attendance_type`: `TH` (or `THEORY`) or `LAB`. Required unless the subject is `TOTAL`.
- `highlight_last_column`: highlight the last column instead of the subject percentage.

## Highlighting

Every percentage strictly below the threshold (60 by default) is highlighted. Cells that do not
hold a number (blank, `absent`, ...) are left alone.

## Input formats

* `csv` comma separated values, one row per line
* `xlsx`, `xls`, `xlsb`, `ods` spreadsheets (first worksheet unless `excelWorksheetName` is set)
* `pdf` PDF documents with a text layer. Cells are separated by at least two spaces.
  Scanned PDFs without text go through OCR (`pdftoppm` then `tesseract`), with cells separated
  by whitespace.

*/

use std::sync::Arc;

use axiomkit_io_excel::{
    ConverterRegistry, EnumFieldType, EnumFieldValue, EnumSheetSelector, ExcelError, ExcelReader,
    ExcelRecord, ExcelWriter, MappingConverter, OptionsRegistry, SpecCellRegion, SpecColumn,
    SpecExtMsg, SpecReadOptions, SpecRecordSchema, SpecTableOptions, plan_header,
};
use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDate;

#[derive(Debug, Default, Clone, PartialEq)]
struct Employee {
    name: String,
    email: Option<String>,
    hired: Option<NaiveDate>,
    grade: Option<i64>,
    remote: Option<bool>,
}

impl ExcelRecord for Employee {
    fn schema() -> SpecRecordSchema<Self> {
        SpecRecordSchema::<Self>::new("Employee")
            .field(
                "name",
                EnumFieldType::Text,
                SpecColumn::new(0, ["Person", "Name"])
                    .with_width(20)
                    .with_comment("Full name"),
                |rec| EnumFieldValue::from(rec.name.clone()),
                |rec, val| rec.name = val.into_text().unwrap_or_default(),
            )
            .field(
                "email",
                EnumFieldType::Text,
                SpecColumn::new(1, ["Person", "Email"]).with_width(30),
                |rec| EnumFieldValue::from(rec.email.clone()),
                |rec, val| rec.email = val.into_text(),
            )
            .field(
                "hired",
                EnumFieldType::Date,
                SpecColumn::new(2, ["Hired"]).with_date_format("%d/%m/%Y"),
                |rec| EnumFieldValue::from(rec.hired),
                |rec, val| rec.hired = val.as_date(),
            )
            .field(
                "grade",
                EnumFieldType::Custom("grade".to_string()),
                SpecColumn::new(3, ["Job", "Grade"])
                    .with_converter("grade")
                    .with_options("grades"),
                |rec| EnumFieldValue::from(rec.grade),
                |rec, val| rec.grade = val.as_i64(),
            )
            .field(
                "remote",
                EnumFieldType::Boolean,
                SpecColumn::new(4, ["Job", "Remote"]),
                |rec| EnumFieldValue::from(rec.remote),
                |rec, val| rec.remote = val.as_bool(),
            )
    }
}

fn registries() -> (ConverterRegistry, OptionsRegistry) {
    let mut registry = ConverterRegistry::new();
    registry.register_converter(
        "grade",
        Arc::new(MappingConverter::new([(1i64, "Junior"), (2i64, "Senior")])),
    );
    let mut options = OptionsRegistry::new();
    options.register_values("grades", ["Junior", "Senior"]);
    (registry, options)
}

fn employees() -> Vec<Employee> {
    vec![
        Employee {
            name: "Ada".to_string(),
            email: Some("ada@example.org".to_string()),
            hired: NaiveDate::from_ymd_opt(2019, 3, 4),
            grade: Some(2),
            remote: Some(true),
        },
        Employee {
            name: "Bo".to_string(),
            email: None,
            hired: NaiveDate::from_ymd_opt(2023, 11, 30),
            grade: Some(1),
            remote: Some(false),
        },
    ]
}

#[test]
fn scenario_a_group_header_with_two_leaves() {
    let l_columns = vec![
        SpecColumn::new(0, ["Group", "A"]).with_width(10),
        SpecColumn::new(1, ["Group", "B"]).with_width(20),
    ];
    let plan = plan_header(&l_columns).expect("plan");

    assert_eq!(plan.n_rows, 2);
    assert_eq!(
        plan.merges,
        vec![SpecCellRegion {
            first_row: 0,
            last_row: 0,
            first_col: 0,
            last_col: 1,
        }]
    );
    let l_leaves: Vec<(&str, SpecCellRegion)> = plan
        .cells
        .iter()
        .filter(|cell| cell.column_index.is_some())
        .map(|cell| (cell.text.as_str(), cell.region))
        .collect();
    assert_eq!(
        l_leaves,
        vec![("A", SpecCellRegion::cell(1, 0)), ("B", SpecCellRegion::cell(1, 1))]
    );
    assert_eq!(plan.widths, vec![(0, 10), (1, 20)]);
}

#[test]
fn scenario_b_single_column_has_no_merge() {
    let plan = plan_header(&[SpecColumn::new(0, ["Only"]).with_width(15)]).expect("plan");
    assert_eq!(plan.n_rows, 1);
    assert!(plan.merges.is_empty());
    assert_eq!(plan.cells.len(), 1);
    assert_eq!(plan.cells[0].region, SpecCellRegion::cell(0, 0));
}

#[test]
fn file_round_trip_with_title_and_messages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("staff.xlsx");
    let (mut registry, options) = registries();

    let mut table = SpecTableOptions::new("Staff");
    table.head_title = Some("Staff list".to_string());
    table.ext_msgs = vec![SpecExtMsg::new("Unit", "R&D")];
    table.if_freeze_header = true;

    let mut writer = ExcelWriter::new(&path);
    let report = writer
        .write_table(&employees(), &mut registry, &options, &table)
        .expect("write table");
    writer.close().expect("close");

    // title, message, spacer, two header rows
    assert_eq!(report.row_data_start, 5);
    assert_eq!(report.n_validations, 1);

    let mut workbook: Xlsx<_> = open_workbook(&path).expect("open");
    let range = workbook.worksheet_range("Staff").expect("range");
    let text_at = |row: u32, col: u32| match range.get_value((row, col)) {
        Some(Data::String(val)) => val.clone(),
        _ => String::new(),
    };
    assert_eq!(text_at(0, 0), "Staff list");
    assert_eq!(text_at(1, 0), "Unit");
    assert_eq!(text_at(1, 1), "R&D");
    assert_eq!(text_at(3, 0), "Person");
    assert_eq!(text_at(3, 2), "Hired");
    assert_eq!(text_at(3, 3), "Job");
    assert_eq!(text_at(4, 1), "Email");
    assert_eq!(text_at(4, 4), "Remote");
    assert_eq!(text_at(5, 2), "04/03/2019");
    assert_eq!(text_at(5, 3), "Senior");
    // sparse write: no email cell for the second record
    assert_eq!(text_at(6, 1), "");

    let mut reader = ExcelReader::open(&path).expect("reader");
    let outcome = reader
        .read_table::<Employee>(
            &SpecReadOptions {
                sheet: EnumSheetSelector::Name("Staff".to_string()),
                start_row: report.row_data_start,
            },
            &mut registry,
        )
        .expect("read table");
    assert_eq!(outcome.records, employees());
    assert!(outcome.issues.is_empty());
}

#[test]
fn scenario_c_null_email_is_not_written() {
    let (mut registry, options) = registries();
    let mut writer = ExcelWriter::new_in_memory();
    let only_name = Employee {
        name: "Cy".to_string(),
        ..Employee::default()
    };
    writer
        .write_table(&[only_name], &mut registry, &options, &SpecTableOptions::new("C"))
        .expect("write table");
    let v_bytes = writer.save_to_buffer().expect("buffer");

    let mut workbook = Xlsx::new(std::io::Cursor::new(v_bytes)).expect("parse");
    let range = workbook.worksheet_range("C").expect("range");
    let l_data_cells: Vec<(u32, String)> = range
        .used_cells()
        .filter(|(row, _, _)| *row >= 2)
        .map(|(_, col, cell)| (col as u32, cell.to_string()))
        .collect();
    assert_eq!(l_data_cells, vec![(0, "Cy".to_string())]);
}

#[test]
fn scenario_d_rows_before_start_row_are_not_decoded() {
    let (mut registry, options) = registries();
    let mut writer = ExcelWriter::new_in_memory();
    writer
        .write_table(&employees(), &mut registry, &options, &SpecTableOptions::new("D"))
        .expect("write table");
    let v_bytes = writer.save_to_buffer().expect("buffer");

    let mut reader = ExcelReader::from_reader(std::io::Cursor::new(v_bytes)).expect("reader");
    let outcome = reader
        .read_table::<Employee>(
            &SpecReadOptions {
                sheet: EnumSheetSelector::Index(0),
                start_row: 2,
            },
            &mut registry,
        )
        .expect("read table");
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].name, "Ada");
    assert_eq!(outcome.records[1].name, "Bo");
}

#[test]
fn read_failures_are_reported_per_field() {
    let (mut registry, options) = registries();
    let mut writer = ExcelWriter::new_in_memory();
    writer
        .write_table(&employees(), &mut registry, &options, &SpecTableOptions::new("Staff"))
        .expect("write table");
    let v_bytes = writer.save_to_buffer().expect("buffer");

    // Read with a registry whose grade mapping lacks "Senior".
    let mut registry_partial = ConverterRegistry::new();
    registry_partial.register_converter(
        "grade",
        Arc::new(MappingConverter::new([(1i64, "Junior")])),
    );
    let mut reader = ExcelReader::from_reader(std::io::Cursor::new(v_bytes)).expect("reader");
    let outcome = reader
        .read_table::<Employee>(
            &SpecReadOptions {
                sheet: EnumSheetSelector::Index(0),
                start_row: 2,
            },
            &mut registry_partial,
        )
        .expect("read table");

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].grade, None);
    assert_eq!(outcome.records[0].name, "Ada");
    assert_eq!(outcome.records[1].grade, Some(1));
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!((outcome.issues[0].row, outcome.issues[0].col), (2, 3));
    assert_eq!(outcome.issues[0].field, "grade");
}

#[test]
fn failed_table_leaves_sibling_tables_intact() {
    let (mut registry, options) = registries();
    let mut writer = ExcelWriter::new_in_memory();
    writer
        .write_table(&employees(), &mut registry, &options, &SpecTableOptions::new("Ok"))
        .expect("first table");

    let bad = Employee {
        grade: Some(7),
        ..Employee::default()
    };
    let err = writer
        .write_table(&[bad], &mut registry, &options, &SpecTableOptions::new("Bad"))
        .expect_err("unmapped grade");
    assert!(matches!(err, ExcelError::Conversion { .. }));

    let v_bytes = writer.save_to_buffer().expect("buffer");
    let reader = ExcelReader::from_reader(std::io::Cursor::new(v_bytes)).expect("reader");
    assert_eq!(reader.sheet_names(), vec!["Ok".to_string()]);
    assert_eq!(writer.report().len(), 1);
}

#[test]
fn option_list_over_limit_fails_before_any_sheet() {
    let (mut registry, _) = registries();
    let mut options = OptionsRegistry::new();
    options.register_values("grades", (0..101).map(|n| format!("G{n}")));

    let mut writer = ExcelWriter::new_in_memory();
    let err = writer
        .write_table(&employees(), &mut registry, &options, &SpecTableOptions::new("X"))
        .expect_err("too many options");
    assert!(matches!(err, ExcelError::Configuration(_)));
    assert!(writer.report().is_empty());
}

#[test]
fn tables_of_different_types_share_one_workbook() {
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Note {
        text: String,
    }

    impl ExcelRecord for Note {
        fn schema() -> SpecRecordSchema<Self> {
            SpecRecordSchema::<Self>::new("Note").field(
                "text",
                EnumFieldType::Text,
                SpecColumn::new(0, ["Text"]),
                |rec| EnumFieldValue::from(rec.text.clone()),
                |rec, val| rec.text = val.into_text().unwrap_or_default(),
            )
        }
    }

    let (mut registry, options) = registries();
    let mut writer = ExcelWriter::new_in_memory();
    writer
        .write_table(&employees(), &mut registry, &options, &SpecTableOptions::new("Staff"))
        .expect("staff");
    let l_notes = vec![
        Note {
            text: "first".to_string(),
        },
        Note {
            text: "second".to_string(),
        },
    ];
    writer
        .write_table(&l_notes, &mut registry, &options, &SpecTableOptions::new("Notes"))
        .expect("notes");
    let v_bytes = writer.save_to_buffer().expect("buffer");

    let mut reader = ExcelReader::from_reader(std::io::Cursor::new(v_bytes)).expect("reader");
    assert_eq!(
        reader.sheet_names(),
        vec!["Staff".to_string(), "Notes".to_string()]
    );
    let outcome = reader
        .read_table::<Note>(
            &SpecReadOptions {
                sheet: EnumSheetSelector::Name("Notes".to_string()),
                start_row: 1,
            },
            &mut registry,
        )
        .expect("read notes");
    assert_eq!(outcome.records, l_notes);
}

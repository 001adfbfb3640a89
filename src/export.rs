use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::error;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::json;

use crate::gate::require_role;
use crate::models::Student;
use crate::AppState;

const HEADERS: [&str; 10] = [
    "ID",
    "First Name",
    "Last Name",
    "Class",
    "Date of Birth",
    "Email",
    "Parent Name",
    "Parent Contact",
    "Address",
    "Created",
];

/// Serialize the full students collection into a spreadsheet. Timestamps are
/// rendered as strings so the sheet needs no cell formats to read.
pub fn build_students_workbook(students: &[Student]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, student) in students.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write(row, 0, student.id)?;
        worksheet.write(row, 1, student.first_name.as_str())?;
        worksheet.write(row, 2, student.last_name.as_str())?;
        worksheet.write(row, 3, student.class_label.as_str())?;
        worksheet.write(row, 4, student.date_of_birth.to_string())?;
        worksheet.write(row, 5, student.email.as_str())?;
        worksheet.write(row, 6, student.parent_name.as_str())?;
        worksheet.write(row, 7, student.parent_phone.as_str())?;
        worksheet.write(row, 8, student.address.as_str())?;
        worksheet.write(
            row,
            9,
            student.created_at.format("%Y-%m-%d %H:%M").to_string(),
        )?;
    }

    workbook.save_to_buffer()
}

#[get("/api/admin/export/students")]
async fn export_students(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let students = sqlx::query_as::<_, Student>(
        "SELECT id, first_name, last_name, class_label, date_of_birth, email,
                parent_name, parent_phone, address, parent_user_id, created_at, updated_at
         FROM students ORDER BY created_at DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    let students = match students {
        Ok(students) => students,
        Err(e) => {
            error!("Failed to fetch students for export: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to export students"
            }));
        }
    };

    let buffer = match build_students_workbook(&students) {
        Ok(buffer) => buffer,
        Err(e) => {
            error!("Failed to build spreadsheet: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to export students"
            }));
        }
    };

    HttpResponse::Ok()
        .content_type("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"students.xlsx\"",
        ))
        .body(buffer)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(export_students);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn student(id: i32) -> Student {
        Student {
            id,
            first_name: "Aarav".to_string(),
            last_name: "Sharma".to_string(),
            class_label: "Class 1".to_string(),
            date_of_birth: "2018-06-15".parse().unwrap(),
            email: "aarav.parent@example.com".to_string(),
            parent_name: "Rohit Sharma".to_string(),
            parent_phone: "9369428170".to_string(),
            address: "12 School Lane".to_string(),
            parent_user_id: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn workbook_builds_for_empty_and_populated_sets() {
        let empty = build_students_workbook(&[]).unwrap();
        // xlsx is a zip container
        assert_eq!(&empty[..2], b"PK");

        let populated = build_students_workbook(&[student(1), student(2)]).unwrap();
        assert_eq!(&populated[..2], b"PK");
        assert!(populated.len() > empty.len());
    }
}

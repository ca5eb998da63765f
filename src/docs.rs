use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use campus_core::{PaginationMeta, PaginationParams};
use campus_models::{LabelCount, MessageResponse};

use crate::modules::auth::controller::ErrorResponse;

/// OpenAPI document served by Swagger UI and Scalar. Request and response
/// bodies referenced by the paths are collected automatically.
#[derive(OpenApi)]
#[openapi(
    paths(
        // auth
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::refresh_token,
        // users
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_me,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        // roles
        crate::modules::roles::controller::get_roles,
        // audit logs
        crate::modules::audit_logs::controller::get_audit_logs,
        // academic
        crate::modules::academic::controller::create_academic_year,
        crate::modules::academic::controller::get_academic_years,
        crate::modules::academic::controller::get_active_academic_year,
        crate::modules::academic::controller::get_academic_year,
        crate::modules::academic::controller::update_academic_year,
        crate::modules::academic::controller::delete_academic_year,
        crate::modules::academic::controller::activate_academic_year,
        crate::modules::academic::controller::close_academic_year,
        crate::modules::academic::controller::create_faculty,
        crate::modules::academic::controller::get_faculties,
        crate::modules::academic::controller::get_faculty,
        crate::modules::academic::controller::update_faculty,
        crate::modules::academic::controller::delete_faculty,
        crate::modules::academic::controller::get_faculty_departments,
        crate::modules::academic::controller::get_faculty_statistics,
        crate::modules::academic::controller::create_department,
        crate::modules::academic::controller::get_departments,
        crate::modules::academic::controller::get_department,
        crate::modules::academic::controller::update_department,
        crate::modules::academic::controller::delete_department,
        crate::modules::academic::controller::get_department_programs,
        crate::modules::academic::controller::create_program,
        crate::modules::academic::controller::get_programs,
        crate::modules::academic::controller::get_program,
        crate::modules::academic::controller::update_program,
        crate::modules::academic::controller::delete_program,
        crate::modules::academic::controller::get_program_subjects,
        crate::modules::academic::controller::link_program_subject,
        crate::modules::academic::controller::unlink_program_subject,
        crate::modules::academic::controller::create_subject,
        crate::modules::academic::controller::get_subjects,
        crate::modules::academic::controller::get_subjects_by_semester,
        crate::modules::academic::controller::get_subject,
        crate::modules::academic::controller::update_subject,
        crate::modules::academic::controller::delete_subject,
        // students
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student_statistics,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::students::controller::get_student_enrollments,
        crate::modules::students::controller::get_student_active_enrollment,
        crate::modules::students::controller::create_enrollment,
        crate::modules::students::controller::get_enrollments,
        crate::modules::students::controller::get_enrollment_statistics,
        crate::modules::students::controller::get_enrollment,
        crate::modules::students::controller::update_enrollment,
        crate::modules::students::controller::delete_enrollment,
        crate::modules::students::controller::pay_enrollment,
        // teachers
        crate::modules::teachers::controller::create_teacher,
        crate::modules::teachers::controller::get_teachers,
        crate::modules::teachers::controller::get_teacher_statistics,
        crate::modules::teachers::controller::get_teacher,
        crate::modules::teachers::controller::update_teacher,
        crate::modules::teachers::controller::delete_teacher,
        crate::modules::teachers::controller::get_teacher_assignments,
        crate::modules::teachers::controller::get_teacher_workload,
        crate::modules::teachers::controller::create_assignment,
        crate::modules::teachers::controller::get_assignments,
        crate::modules::teachers::controller::get_assignment,
        crate::modules::teachers::controller::update_assignment,
        crate::modules::teachers::controller::delete_assignment,
        // evaluations
        crate::modules::evaluations::controller::create_evaluation_type,
        crate::modules::evaluations::controller::get_evaluation_types,
        crate::modules::evaluations::controller::get_evaluation_type,
        crate::modules::evaluations::controller::update_evaluation_type,
        crate::modules::evaluations::controller::delete_evaluation_type,
        crate::modules::evaluations::controller::create_evaluation,
        crate::modules::evaluations::controller::get_evaluations,
        crate::modules::evaluations::controller::get_evaluation,
        crate::modules::evaluations::controller::update_evaluation,
        crate::modules::evaluations::controller::delete_evaluation,
        crate::modules::evaluations::controller::get_evaluation_grades,
        crate::modules::evaluations::controller::get_evaluation_statistics,
        crate::modules::evaluations::controller::duplicate_evaluation,
        crate::modules::evaluations::controller::create_grade,
        crate::modules::evaluations::controller::get_grades,
        crate::modules::evaluations::controller::bulk_grades,
        crate::modules::evaluations::controller::get_grades_by_student,
        crate::modules::evaluations::controller::get_grade,
        crate::modules::evaluations::controller::update_grade,
        crate::modules::evaluations::controller::delete_grade,
        crate::modules::evaluations::controller::get_results,
        crate::modules::evaluations::controller::get_result,
        crate::modules::evaluations::controller::compute_result,
        crate::modules::evaluations::controller::compute_subject_results,
        crate::modules::evaluations::controller::get_transcript,
        crate::modules::evaluations::controller::get_result_statistics,
        // deliberations
        crate::modules::deliberations::controller::create_deliberation,
        crate::modules::deliberations::controller::get_deliberations,
        crate::modules::deliberations::controller::get_deliberation,
        crate::modules::deliberations::controller::update_deliberation,
        crate::modules::deliberations::controller::delete_deliberation,
        crate::modules::deliberations::controller::get_decisions,
        crate::modules::deliberations::controller::generate_decisions,
        crate::modules::deliberations::controller::update_decision,
        crate::modules::deliberations::controller::close_deliberation,
        crate::modules::deliberations::controller::validate_deliberation,
        crate::modules::deliberations::controller::get_jury,
        crate::modules::deliberations::controller::add_jury_member,
        crate::modules::deliberations::controller::remove_jury_member,
        // schedule
        crate::modules::schedule::controller::create_building,
        crate::modules::schedule::controller::get_buildings,
        crate::modules::schedule::controller::get_building,
        crate::modules::schedule::controller::update_building,
        crate::modules::schedule::controller::delete_building,
        crate::modules::schedule::controller::create_room,
        crate::modules::schedule::controller::get_rooms,
        crate::modules::schedule::controller::get_available_rooms,
        crate::modules::schedule::controller::get_room,
        crate::modules::schedule::controller::update_room,
        crate::modules::schedule::controller::delete_room,
        crate::modules::schedule::controller::get_room_occupancy,
        crate::modules::schedule::controller::create_time_slot,
        crate::modules::schedule::controller::get_time_slots,
        crate::modules::schedule::controller::get_time_slot,
        crate::modules::schedule::controller::update_time_slot,
        crate::modules::schedule::controller::delete_time_slot,
        crate::modules::schedule::controller::create_course,
        crate::modules::schedule::controller::get_courses,
        crate::modules::schedule::controller::get_courses_by_day,
        crate::modules::schedule::controller::get_timetable,
        crate::modules::schedule::controller::get_courses_by_teacher,
        crate::modules::schedule::controller::get_course,
        crate::modules::schedule::controller::update_course,
        crate::modules::schedule::controller::delete_course,
        crate::modules::schedule::controller::get_conflicts,
        crate::modules::schedule::controller::detect_conflicts,
        crate::modules::schedule::controller::get_conflict,
        crate::modules::schedule::controller::resolve_conflict,
        crate::modules::schedule::controller::ignore_conflict,
        // finance
        crate::modules::finance::controller::create_fee,
        crate::modules::finance::controller::get_fees,
        crate::modules::finance::controller::get_fee,
        crate::modules::finance::controller::update_fee,
        crate::modules::finance::controller::delete_fee,
        crate::modules::finance::controller::create_payment,
        crate::modules::finance::controller::get_payments,
        crate::modules::finance::controller::get_payment,
        crate::modules::finance::controller::validate_payment,
        crate::modules::finance::controller::reject_payment,
        crate::modules::finance::controller::cancel_payment,
        crate::modules::finance::controller::create_scholarship,
        crate::modules::finance::controller::get_scholarships,
        crate::modules::finance::controller::get_scholarship,
        crate::modules::finance::controller::update_scholarship,
        crate::modules::finance::controller::delete_scholarship,
        crate::modules::finance::controller::suspend_scholarship,
        crate::modules::finance::controller::reactivate_scholarship,
        crate::modules::finance::controller::generate_invoice,
        crate::modules::finance::controller::get_invoices,
        crate::modules::finance::controller::get_unpaid_invoices,
        crate::modules::finance::controller::get_overdue_invoices,
        crate::modules::finance::controller::get_settled_invoices,
        crate::modules::finance::controller::get_invoice_statistics,
        crate::modules::finance::controller::get_invoices_by_student,
        crate::modules::finance::controller::get_invoice,
        crate::modules::finance::controller::cancel_invoice,
        // documents
        crate::modules::documents::controller::create_template,
        crate::modules::documents::controller::get_templates,
        crate::modules::documents::controller::get_active_templates,
        crate::modules::documents::controller::get_template,
        crate::modules::documents::controller::update_template,
        crate::modules::documents::controller::delete_template,
        crate::modules::documents::controller::preview_template,
        crate::modules::documents::controller::duplicate_template,
        crate::modules::documents::controller::create_document,
        crate::modules::documents::controller::get_documents,
        crate::modules::documents::controller::request_document,
        crate::modules::documents::controller::get_my_documents,
        crate::modules::documents::controller::get_pending_documents,
        crate::modules::documents::controller::verify_document,
        crate::modules::documents::controller::get_document_statistics,
        crate::modules::documents::controller::get_document,
        crate::modules::documents::controller::delete_document,
        crate::modules::documents::controller::generate_document,
        crate::modules::documents::controller::deliver_document,
        crate::modules::documents::controller::cancel_document,
        // communications
        crate::modules::communications::controller::create_announcement,
        crate::modules::communications::controller::get_announcements,
        crate::modules::communications::controller::get_published_announcements,
        crate::modules::communications::controller::get_urgent_announcements,
        crate::modules::communications::controller::get_announcement_statistics,
        crate::modules::communications::controller::get_announcement,
        crate::modules::communications::controller::update_announcement,
        crate::modules::communications::controller::delete_announcement,
        crate::modules::communications::controller::publish_announcement,
        crate::modules::communications::controller::archive_announcement,
        crate::modules::communications::controller::create_notification,
        crate::modules::communications::controller::broadcast_notification,
        crate::modules::communications::controller::get_my_notifications,
        crate::modules::communications::controller::get_unread_notifications,
        crate::modules::communications::controller::mark_notification_read,
        crate::modules::communications::controller::mark_all_notifications_read,
        crate::modules::communications::controller::get_notification_statistics,
        crate::modules::communications::controller::send_message,
        crate::modules::communications::controller::get_inbox,
        crate::modules::communications::controller::get_sent_messages,
        crate::modules::communications::controller::get_unread_messages,
        crate::modules::communications::controller::get_archived_messages,
        crate::modules::communications::controller::get_message_statistics,
        crate::modules::communications::controller::get_message,
        crate::modules::communications::controller::mark_message_read,
        crate::modules::communications::controller::archive_message,
        crate::modules::communications::controller::unarchive_message,
        crate::modules::communications::controller::reply_to_message,
        crate::modules::communications::controller::get_message_thread,
        crate::modules::communications::controller::get_my_preferences,
        crate::modules::communications::controller::update_my_preferences,
        // resources
        crate::modules::resources::controller::create_equipment,
        crate::modules::resources::controller::get_equipment_list,
        crate::modules::resources::controller::get_available_equipment,
        crate::modules::resources::controller::check_equipment_availability,
        crate::modules::resources::controller::get_equipment_statistics,
        crate::modules::resources::controller::get_equipment,
        crate::modules::resources::controller::update_equipment,
        crate::modules::resources::controller::delete_equipment,
        crate::modules::resources::controller::change_equipment_state,
        crate::modules::resources::controller::get_maintenance_history,
        crate::modules::resources::controller::create_reservation,
        crate::modules::resources::controller::get_reservations,
        crate::modules::resources::controller::get_my_reservations,
        crate::modules::resources::controller::get_pending_reservations,
        crate::modules::resources::controller::get_reservation_statistics,
        crate::modules::resources::controller::get_reservation,
        crate::modules::resources::controller::approve_reservation,
        crate::modules::resources::controller::reject_reservation,
        crate::modules::resources::controller::cancel_reservation,
        crate::modules::resources::controller::return_reserved_equipment,
        crate::modules::resources::controller::create_maintenance,
        crate::modules::resources::controller::get_maintenances,
        crate::modules::resources::controller::get_maintenance,
        crate::modules::resources::controller::update_maintenance,
        crate::modules::resources::controller::delete_maintenance,
        crate::modules::resources::controller::start_maintenance,
        crate::modules::resources::controller::complete_maintenance,
        crate::modules::resources::controller::cancel_maintenance,
    ),
    components(
        schemas(
            ErrorResponse,
            MessageResponse,
            LabelCount,
            PaginationMeta,
            PaginationParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and token refresh"),
        (name = "Users", description = "User accounts"),
        (name = "Roles", description = "Roles and their permissions"),
        (name = "Audit", description = "Audit trail of sensitive actions"),
        (name = "Academic Years", description = "Academic years and the active year"),
        (name = "Faculties", description = "Faculties"),
        (name = "Departments", description = "Departments"),
        (name = "Programs", description = "Degree programs and their subjects"),
        (name = "Subjects", description = "Subjects"),
        (name = "Students", description = "Student records"),
        (name = "Enrollments", description = "Yearly enrollments and tuition balance"),
        (name = "Teachers", description = "Teaching staff"),
        (name = "Assignments", description = "Teaching assignments"),
        (name = "Evaluations", description = "Evaluation types, exams and assessments"),
        (name = "Grades", description = "Grade entry"),
        (name = "Results", description = "Subject results and transcripts"),
        (name = "Deliberations", description = "Jury sessions and decisions"),
        (name = "Buildings", description = "Campus buildings"),
        (name = "Rooms", description = "Rooms and occupancy"),
        (name = "Time Slots", description = "Weekly time slots"),
        (name = "Courses", description = "Scheduled courses and timetables"),
        (name = "Conflicts", description = "Timetable conflict detection"),
        (name = "Fees", description = "Tuition fees"),
        (name = "Payments", description = "Payments and receipts"),
        (name = "Scholarships", description = "Scholarships and reductions"),
        (name = "Invoices", description = "Invoices"),
        (name = "Document Templates", description = "HTML templates for official documents"),
        (name = "Documents", description = "Official documents and verification"),
        (name = "Announcements", description = "Campus announcements"),
        (name = "Notifications", description = "User notifications"),
        (name = "Messages", description = "Private messages"),
        (name = "Notification Preferences", description = "Per-user notification settings"),
        (name = "Equipment", description = "Equipment inventory"),
        (name = "Reservations", description = "Room and equipment reservations"),
        (name = "Maintenances", description = "Equipment maintenance")
    ),
    info(
        title = "Campus API",
        version = "0.1.0",
        description = "University management REST API built with Rust, Axum and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

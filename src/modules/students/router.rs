use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_student, delete_student, get_student, get_student_by_matric, get_students,
    update_student,
};

pub fn init_students_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_student).get(get_students))
        .route("/matric/{matric_number}", get(get_student_by_matric))
        .route(
            "/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
}

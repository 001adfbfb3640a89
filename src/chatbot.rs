use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Canned question/answer pairs the widget offers as quick picks. Selecting
/// one replays its answer; nothing here is a real conversational system.
pub const FAQS: &[(&str, &str)] = &[
    (
        "What are the admission requirements?",
        "Admissions are open from Nursery to Class 7. You'll need the child's birth certificate, two passport photos, and the previous school's report card where applicable.",
    ),
    (
        "What are the school timings?",
        "School runs Monday to Saturday, 8:00 AM to 2:00 PM. Nursery to UKG finish at 12:30 PM.",
    ),
    (
        "What is the fee structure?",
        "Fees vary by class level and cover tuition, books, and uniform. Transport is optional. Contact the office for the current schedule.",
    ),
    (
        "Is transport available?",
        "Yes, school buses cover most nearby areas. Routes and charges are available at the front office.",
    ),
    (
        "How can parents track progress?",
        "Parents get a dashboard login showing attendance, homework, fees, and test results for each child.",
    ),
];

pub const FALLBACK_ANSWER: &str =
    "Thanks for your question! Our team will get back to you with the details.";

pub const CONTACT_CARD: &str =
    "You can also reach us directly — call the school office or leave your details through the contact form and we'll call you back.";

#[derive(Debug, Serialize)]
pub struct FaqItem {
    pub question: &'static str,
    pub answer: &'static str,
}

/// Replay for one user turn. A recognized canned question gets its canned
/// answer; any free-text message gets the fixed fallback plus the contact
/// card.
pub fn reply_for(message: &str) -> Vec<&'static str> {
    let trimmed = message.trim();
    for &(question, answer) in FAQS {
        if question.eq_ignore_ascii_case(trimmed) {
            return vec![answer];
        }
    }
    vec![FALLBACK_ANSWER, CONTACT_CARD]
}

#[get("/api/chatbot/faq")]
async fn list_faq() -> impl Responder {
    let items: Vec<FaqItem> = FAQS
        .iter()
        .map(|&(question, answer)| FaqItem { question, answer })
        .collect();
    HttpResponse::Ok().json(items)
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    message: String,
}

#[post("/api/chatbot/message")]
async fn chat_message(payload: web::Json<ChatMessage>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "replies": reply_for(&payload.message)
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_faq);
    cfg.service(chat_message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_question_gets_its_answer() {
        let replies = reply_for("What are the school timings?");
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("8:00 AM"));
    }

    #[test]
    fn matching_ignores_case_and_whitespace() {
        let replies = reply_for("  what are the school timings?  ");
        assert_eq!(replies.len(), 1);
    }

    #[test]
    fn free_text_always_gets_fallback_and_contact_card() {
        let replies = reply_for("Do you teach violin?");
        assert_eq!(replies, vec![FALLBACK_ANSWER, CONTACT_CARD]);
        let replies = reply_for("");
        assert_eq!(replies, vec![FALLBACK_ANSWER, CONTACT_CARD]);
    }
}

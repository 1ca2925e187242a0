use crate::types::{Language, Rating};

pub fn greeting(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "مرحباً! كيف يمكنني مساعدتك؟",
        Language::English => "Hello! How can I help you?",
    }
}

pub fn no_answer(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "عذرًا، لم أجد إجابة مناسبة لسؤالك حول قوانين العمل المصرية.",
        Language::English => {
            "Sorry, I could not find a suitable answer to your question about Egyptian labor laws."
        }
    }
}

pub fn connection_error(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "عذرًا، حدث خطأ في الاتصال بالخادم. تأكد من تشغيل الخادم.",
        Language::English => {
            "Sorry, there was an error connecting to the server. Make sure the server is running."
        }
    }
}

pub fn processing_error(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "عذرًا، حدث خطأ أثناء معالجة سؤالك.",
        Language::English => "Sorry, an error occurred while processing your question.",
    }
}

pub fn searching(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "جاري البحث في قوانين العمل...",
        Language::English => "Searching labor laws...",
    }
}

pub fn prompt(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "اسأل عن قوانين العمل...",
        Language::English => "Ask about labor laws",
    }
}

pub fn busy(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "يرجى الانتظار حتى تصل الإجابة السابقة.",
        Language::English => "Please wait for the previous answer to arrive.",
    }
}

pub fn chat_with(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "تحدث مع iScore",
        Language::English => "Chat With iScore",
    }
}

/// Confirmation shown after a rating changes.
pub fn rating_confirmation(lang: Language, rating: Rating) -> &'static str {
    match (lang, rating) {
        (Language::Arabic, Rating::Up) => "شكرًا لتقييمك! سعداء بأن الإجابة كانت مفيدة.",
        (Language::Arabic, Rating::Down) => "شكرًا لتقييمك! سنعمل على تحسين إجاباتنا.",
        (Language::Arabic, Rating::None) => "تم إلغاء تقييمك.",
        (Language::English, Rating::Up) => "Thanks for your feedback! Glad the answer helped.",
        (Language::English, Rating::Down) => {
            "Thanks for your feedback! We will work on improving our answers."
        }
        (Language::English, Rating::None) => "Your rating was removed.",
    }
}

pub fn not_rateable(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "يمكن تقييم إجابات المساعد فقط.",
        Language::English => "Only assistant answers can be rated.",
    }
}

pub fn not_found(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "لا توجد رسالة بهذا الرقم.",
        Language::English => "There is no message with that number.",
    }
}

pub fn feedback_disabled(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "التقييم غير متاح.",
        Language::English => "Feedback is not available.",
    }
}

pub fn common_questions_title(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "أسئلة شائعة (اكتب /faq ورقم السؤال):",
        Language::English => "Common questions (type /faq and the number):",
    }
}

pub fn no_common_questions(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "لا توجد أسئلة شائعة حاليًا.",
        Language::English => "There are no common questions right now.",
    }
}

pub fn help(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => {
            "الأوامر: /new محادثة جديدة، /lang تغيير اللغة، /theme تغيير المظهر، \
/up رقم أو /down رقم لتقييم إجابة، /faq أسئلة شائعة، /home الصفحة الرئيسية، /quit خروج"
        }
        Language::English => {
            "Commands: /new new chat, /lang switch language, /theme switch theme, \
/up N or /down N rate an answer, /faq common questions, /home landing page, /quit exit"
        }
    }
}

pub fn unknown_command(lang: Language) -> &'static str {
    match lang {
        Language::Arabic => "أمر غير معروف. اكتب /help لعرض الأوامر.",
        Language::English => "Unknown command. Type /help to list commands.",
    }
}

/// Copy for the landing screen.
pub struct Landing {
    pub headline: [&'static str; 3],
    pub tagline: [&'static str; 2],
    pub call_to_action: &'static str,
    pub language_switch: &'static str,
}

pub fn landing(lang: Language) -> Landing {
    match lang {
        Language::Arabic => Landing {
            headline: [
                "احصل على إجابات فورية",
                "حول قوانين العمل المصرية",
                "مع مساعد iScore الذكي",
            ],
            tagline: [
                "يوفر مساعدة فورية في أسئلة قوانين العمل المصرية",
                "وحقوق العمال - متاح في أي وقت.",
            ],
            call_to_action: "لدي سؤال! (اضغط Enter)",
            language_switch: "/lang English",
        },
        Language::English => Landing {
            headline: [
                "Get instant answers",
                "about Egyptian labor laws",
                "with the iScore assistant",
            ],
            tagline: [
                "Provides instant help with Egyptian labor law questions",
                "and workers' rights - available anytime.",
            ],
            call_to_action: "I have a question! (press Enter)",
            language_switch: "/lang العربية",
        },
    }
}

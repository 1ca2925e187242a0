use crate::config::Theme;
use crate::gateway::CommonQuestion;
use crate::locale;
use crate::session::SessionController;
use crate::types::{Language, Message, Rating, Sender};
use crossterm::style::{Color, Stylize};
use std::io::{self, Write};

const USER_COLOR: Color = Color::Rgb {
    r: 0x4f,
    g: 0x37,
    b: 0x95,
};
const BOT_COLOR: Color = Color::Rgb {
    r: 0x3e,
    g: 0xc1,
    b: 0xc7,
};
const RULE: &str = "────────────────────";

fn muted(theme: Theme) -> Color {
    match theme {
        Theme::Light => Color::DarkGrey,
        Theme::Dark => Color::White,
    }
}

pub fn render_landing(out: &mut impl Write, lang: Language, theme: Theme) -> io::Result<()> {
    let copy = locale::landing(lang);
    writeln!(out)?;
    writeln!(out, "  {}", copy.language_switch.with(muted(theme)))?;
    writeln!(out)?;
    writeln!(out, "  {}", copy.headline[0].bold())?;
    writeln!(out, "  {}", copy.headline[1].bold())?;
    writeln!(out, "  {}", copy.headline[2].bold().italic().with(BOT_COLOR))?;
    writeln!(out)?;
    for line in copy.tagline {
        writeln!(out, "  {}", line.italic().with(muted(theme)))?;
    }
    writeln!(out)?;
    writeln!(out, "  {}", copy.call_to_action.bold().with(USER_COLOR))?;
    out.flush()
}

pub fn render_header(out: &mut impl Write, lang: Language) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  {}", locale::chat_with(lang).bold())?;
    writeln!(out, "  {}", locale::help(lang).dim())
}

pub fn render_message(
    out: &mut impl Write,
    index: usize,
    message: &Message,
    rating: Option<Rating>,
    theme: Theme,
) -> io::Result<()> {
    match message.sender {
        Sender::System => {
            writeln!(
                out,
                "{}",
                format!("{RULE} {} {RULE}", message.text)
                    .italic()
                    .with(muted(theme))
            )
        }
        Sender::User => {
            writeln!(out, "{} {}", "›".with(USER_COLOR), message.text.as_str().with(USER_COLOR))?;
            writeln!(out, "  {}", message.timestamp.as_str().with(muted(theme)))
        }
        Sender::Bot => {
            writeln!(out, "{} {}", "‹".with(BOT_COLOR), message.text.as_str().with(BOT_COLOR))?;
            // `rating` is only passed for messages that accept feedback.
            let marker = match rating {
                Some(Rating::Up) => format!(" #{index} [+]"),
                Some(Rating::Down) => format!(" #{index} [-]"),
                Some(Rating::None) => format!(" #{index}"),
                None => String::new(),
            };
            writeln!(
                out,
                "  {}",
                format!("{}{marker}", message.timestamp).with(muted(theme))
            )
        }
    }
}

pub fn render_transcript(
    out: &mut impl Write,
    session: &SessionController,
    theme: Theme,
) -> io::Result<()> {
    for (index, message) in session.transcript().iter().enumerate() {
        let rating = (session.feedback_enabled() && session.is_rateable(index))
            .then(|| session.rating_at(index));
        render_message(out, index, message, rating, theme)?;
    }
    if session.is_awaiting() {
        render_searching(out, session.language())?;
    }
    out.flush()
}

pub fn render_searching(out: &mut impl Write, lang: Language) -> io::Result<()> {
    writeln!(out, "{}", locale::searching(lang).italic().dim())?;
    out.flush()
}

pub fn render_notice(out: &mut impl Write, text: &str, theme: Theme) -> io::Result<()> {
    writeln!(out, "{}", text.italic().with(muted(theme)))?;
    out.flush()
}

pub fn render_common_questions(
    out: &mut impl Write,
    lang: Language,
    questions: &[CommonQuestion],
) -> io::Result<()> {
    if questions.is_empty() {
        writeln!(out, "{}", locale::no_common_questions(lang))?;
        return out.flush();
    }
    writeln!(out, "{}", locale::common_questions_title(lang).bold())?;
    for (i, question) in questions.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, question.text)?;
    }
    out.flush()
}

pub fn render_prompt(out: &mut impl Write, lang: Language) -> io::Result<()> {
    write!(out, "{} ", format!("{} ›", locale::prompt(lang)).dim())?;
    out.flush()
}

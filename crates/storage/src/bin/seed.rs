use std::fmt;

use chrono::{DateTime, Utc};
use course_core::model::{
    CourseId, Lesson, LessonId, Quiz, QuizQuestion, DEFAULT_PASSING_THRESHOLD,
};
use storage::repository::{NewCourseRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_title: String,
    course_desc: Option<String>,
    lessons: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLessons { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLessons { raw } => write!(f, "invalid --lessons value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("COURSE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut course_title = std::env::var("COURSE_TITLE")
            .unwrap_or_else(|_| "Personal Branding Fundamentals".into());
        let mut course_desc = std::env::var("COURSE_DESC").ok();
        let mut lessons = std::env::var("COURSE_LESSONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(6);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--title" => {
                    course_title = require_value(&mut args, "--title")?;
                }
                "--desc" => {
                    course_desc = Some(require_value(&mut args, "--desc")?);
                }
                "--lessons" => {
                    let value = require_value(&mut args, "--lessons")?;
                    lessons = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLessons { raw: value })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value })?;
                    now = Some(parsed.with_timezone(&Utc));
                }
                other => return Err(ArgsError::UnknownArg(other.to_string())),
            }
        }

        Ok(Self {
            db_url,
            course_title,
            course_desc,
            lessons,
            now,
        })
    }
}

fn demo_quiz(course_id: CourseId, lesson_id: LessonId) -> Result<Quiz, course_core::Error> {
    let questions = vec![
        QuizQuestion::new(
            "What does a personal brand communicate first?",
            vec![
                "Your follower count".into(),
                "Your positioning and values".into(),
                "Your pricing".into(),
                "Your logo".into(),
            ],
            1,
            Some("Positioning comes before visuals or metrics.".into()),
        )?,
        QuizQuestion::new(
            "How often should you revisit your positioning statement?",
            vec![
                "Never".into(),
                "Only when rebranding".into(),
                "At a regular cadence".into(),
                "Daily".into(),
            ],
            2,
            None,
        )?,
    ];
    Ok(Quiz::new(
        course_id,
        lesson_id,
        DEFAULT_PASSING_THRESHOLD,
        questions,
    )?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse()?;
    let now = args.now.unwrap_or_else(Utc::now);

    let storage = Storage::sqlite(&args.db_url).await?;

    let course_id = storage
        .courses
        .insert_course(NewCourseRecord {
            title: args.course_title.clone(),
            description: args.course_desc.clone(),
            is_published: true,
            created_at: now,
        })
        .await?;

    let samples = [
        ("Why personal branding matters", "8 min"),
        ("Defining your positioning", "12 min"),
        ("Telling your story", "10 min"),
        ("Choosing your channels", "9 min"),
        ("Content that compounds", "14 min"),
        ("Measuring what matters", "7 min"),
    ];
    for i in 0..args.lessons {
        let idx = (i as usize) % samples.len();
        let (title, duration) = samples[idx];
        let video = format!(
            "https://videos.example.com/{}/lesson-{}.mp4",
            course_id,
            i + 1
        );
        let lesson = Lesson::new(
            LessonId::new(u64::from(i + 1)),
            course_id,
            title,
            Some(video.as_str()),
            Some(duration.to_string()),
            i + 1,
            now,
        )?;
        storage.lessons.upsert_lesson(&lesson).await?;
    }

    if args.lessons > 0 {
        let quiz = demo_quiz(course_id, LessonId::new(u64::from(args.lessons)))?;
        storage.quizzes.replace_quiz(&quiz).await?;
    }

    println!(
        "Seeded course {} ({}) with {} lessons into {}",
        course_id.value(),
        args.course_title,
        args.lessons,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

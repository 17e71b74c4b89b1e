//! Static course content: topics per subject, starter topics, topic
//! difficulty, focus templates and study time slots.

use crate::model::LearningStyle;

pub const DEFAULT_TIME_SLOT: &str = "Morning (9-12 PM)";
pub const DEFAULT_TOPIC_DIFFICULTY: f64 = 0.5;
pub const REVIEW_TOPIC: &str = "Review Basics";

pub const TIME_SLOTS: [&str; 5] = [
    "Early Morning (6-9 AM)",
    "Morning (9-12 PM)",
    "Afternoon (12-4 PM)",
    "Evening (4-8 PM)",
    "Night (8-11 PM)",
];

pub struct SubjectInfo {
    pub key: &'static str,
    pub display_name: &'static str,
    pub topics: &'static [&'static str],
}

pub const SUBJECTS: &[SubjectInfo] = &[
    SubjectInfo {
        key: "programming",
        display_name: "Programming",
        topics: &["Python", "Java", "JavaScript", "C++", "SQL"],
    },
    SubjectInfo {
        key: "web_dev",
        display_name: "Web Development",
        topics: &["HTML/CSS", "React", "Node.js", "MongoDB", "APIs"],
    },
    SubjectInfo {
        key: "mobile_dev",
        display_name: "Mobile Development",
        topics: &["Android Development", "iOS Development", "React Native", "Flutter", "Mobile UI/UX"],
    },
    SubjectInfo {
        key: "ai",
        display_name: "Artificial Intelligence",
        topics: &[
            "Machine Learning",
            "Deep Learning",
            "Neural Networks",
            "Computer Vision",
            "Natural Language Processing",
        ],
    },
    SubjectInfo {
        key: "software_eng",
        display_name: "Software Engineering",
        topics: &[
            "Software Design Patterns",
            "Clean Code",
            "Testing & QA",
            "DevOps & CI/CD",
            "Agile Methodologies",
        ],
    },
    SubjectInfo {
        key: "networks",
        display_name: "Computer Networks",
        topics: &[
            "Network Protocols",
            "Network Security",
            "Cloud Computing",
            "Distributed Systems",
            "Cybersecurity",
        ],
    },
    SubjectInfo {
        key: "databases",
        display_name: "Database Systems",
        topics: &["SQL Advanced", "NoSQL Databases", "Database Design", "Data Warehousing", "Big Data"],
    },
    SubjectInfo {
        key: "os",
        display_name: "Operating Systems",
        topics: &["Process Management", "Memory Management", "File Systems", "System Security", "Shell Scripting"],
    },
    SubjectInfo {
        key: "architecture",
        display_name: "Computer Architecture",
        topics: &[
            "Digital Logic",
            "Computer Organization",
            "Assembly Language",
            "Microprocessors",
            "Embedded Systems",
        ],
    },
    SubjectInfo {
        key: "math",
        display_name: "Mathematics",
        topics: &["Basic Algebra", "Fractions", "Decimals", "Geometry Basics"],
    },
    SubjectInfo {
        key: "physics",
        display_name: "Physics",
        topics: &["Newton's Laws", "Motion", "Forces", "Energy"],
    },
    SubjectInfo {
        key: "chemistry",
        display_name: "Chemistry",
        topics: &["Periodic Table", "Chemical Bonds", "Elements", "Compounds"],
    },
];

const TOPIC_DIFFICULTY: &[(&str, f64)] = &[
    ("Python", 0.3),
    ("Java", 0.5),
    ("JavaScript", 0.4),
    ("C++", 0.7),
    ("SQL", 0.4),
    ("HTML/CSS", 0.2),
    ("React", 0.6),
    ("Node.js", 0.5),
    ("MongoDB", 0.5),
    ("APIs", 0.5),
    ("Android Development", 0.6),
    ("iOS Development", 0.6),
    ("React Native", 0.6),
    ("Flutter", 0.5),
    ("Mobile UI/UX", 0.4),
    ("Machine Learning", 0.7),
    ("Deep Learning", 0.8),
    ("Neural Networks", 0.8),
    ("Computer Vision", 0.8),
    ("Natural Language Processing", 0.8),
    ("Software Design Patterns", 0.6),
    ("Clean Code", 0.3),
    ("Testing & QA", 0.4),
    ("DevOps & CI/CD", 0.6),
    ("Agile Methodologies", 0.3),
    ("Network Protocols", 0.5),
    ("Network Security", 0.7),
    ("Cloud Computing", 0.6),
    ("Distributed Systems", 0.8),
    ("Cybersecurity", 0.7),
    ("SQL Advanced", 0.6),
    ("NoSQL Databases", 0.5),
    ("Database Design", 0.5),
    ("Data Warehousing", 0.6),
    ("Big Data", 0.7),
    ("Process Management", 0.6),
    ("Memory Management", 0.7),
    ("File Systems", 0.5),
    ("System Security", 0.7),
    ("Shell Scripting", 0.4),
    ("Digital Logic", 0.5),
    ("Computer Organization", 0.6),
    ("Assembly Language", 0.8),
    ("Microprocessors", 0.7),
    ("Embedded Systems", 0.7),
];

pub fn subject(key: &str) -> Option<&'static SubjectInfo> {
    SUBJECTS.iter().find(|s| s.key == key)
}

/// Topics the generator draws from; unknown subjects get a review topic.
pub fn topics_for(subject_key: &str) -> &'static [&'static str] {
    match subject(subject_key) {
        Some(info) => info.topics,
        None => &[REVIEW_TOPIC],
    }
}

/// Suggested first topics for a subject with no recorded practice.
pub fn starter_topics(subject_key: &str) -> Vec<String> {
    match subject(subject_key) {
        Some(info) => info.topics.iter().take(4).map(|t| t.to_string()).collect(),
        None => vec![REVIEW_TOPIC.to_string()],
    }
}

pub fn display_name(subject_key: &str) -> String {
    match subject(subject_key) {
        Some(info) => info.display_name.to_string(),
        None => capitalize(subject_key),
    }
}

pub fn topic_difficulty(topic: &str) -> f64 {
    TOPIC_DIFFICULTY
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, d)| *d)
        .unwrap_or(DEFAULT_TOPIC_DIFFICULTY)
}

pub fn focus_templates(style: LearningStyle) -> &'static [&'static str; 4] {
    match style {
        LearningStyle::Visual => &[
            "Watch video lectures on {topic}",
            "Create mind maps for {topic}",
            "Draw diagrams that explain {topic}",
            "Review infographics and charts about {topic}",
        ],
        LearningStyle::Auditory => &[
            "Listen to a podcast or recorded lecture on {topic}",
            "Explain {topic} out loud in your own words",
            "Discuss {topic} with a study partner",
            "Record and replay your notes on {topic}",
        ],
        LearningStyle::Practical => &[
            "Solve practice problems on {topic}",
            "Build a small project using {topic}",
            "Complete hands-on exercises for {topic}",
            "Apply {topic} to a real-world case study",
        ],
    }
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

//! Fixed label enumerations for the gender, race and emotion attributes.
//!
//! The analysis service reports each attribute as a label → probability
//! mapping. After the winning label is picked, it is resolved here into a
//! typed variant with a display name. Labels outside the enumeration are a
//! hard error ([`FaceCaptureError::UnknownCategory`]): they mean the service
//! speaks a different vocabulary than this crate was built for.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::FaceCaptureError;

/// Which attribute a label belongs to. Used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    Gender,
    Race,
    Emotion,
}

impl Display for CategoryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CategoryKind::Gender => write!(f, "gender"),
            CategoryKind::Race => write!(f, "race"),
            CategoryKind::Emotion => write!(f, "emotion"),
        }
    }
}

/// Common behaviour of the attribute enumerations.
pub trait Category: Sized + Copy + 'static {
    /// The attribute this enumeration describes.
    const KIND: CategoryKind;

    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    /// The label the analysis service uses for this variant.
    fn label(self) -> &'static str;

    /// Human-readable name written into capture results.
    fn display_name(self) -> &'static str;

    /// Resolve a service label, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`FaceCaptureError::UnknownCategory`] when no variant carries
    /// the label.
    fn from_label(label: &str) -> Result<Self, FaceCaptureError> {
        Self::ALL
            .iter()
            .copied()
            .find(|variant| variant.label().eq_ignore_ascii_case(label))
            .ok_or_else(|| FaceCaptureError::UnknownCategory {
                kind: Self::KIND,
                label: label.to_string(),
            })
    }
}

/// Apparent gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Man,
    Woman,
}

impl Category for Gender {
    const KIND: CategoryKind = CategoryKind::Gender;
    const ALL: &'static [Self] = &[Gender::Man, Gender::Woman];

    fn label(self) -> &'static str {
        match self {
            Gender::Man => "Man",
            Gender::Woman => "Woman",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Gender::Man => "男",
            Gender::Woman => "女",
        }
    }
}

/// Apparent race, using the analysis service's six-way split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Race {
    Asian,
    Indian,
    Black,
    White,
    MiddleEastern,
    LatinoHispanic,
}

impl Category for Race {
    const KIND: CategoryKind = CategoryKind::Race;
    const ALL: &'static [Self] = &[
        Race::Asian,
        Race::Indian,
        Race::Black,
        Race::White,
        Race::MiddleEastern,
        Race::LatinoHispanic,
    ];

    fn label(self) -> &'static str {
        match self {
            Race::Asian => "asian",
            Race::Indian => "indian",
            Race::Black => "black",
            Race::White => "white",
            Race::MiddleEastern => "middle eastern",
            Race::LatinoHispanic => "latino hispanic",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Race::Asian => "亚洲人",
            Race::Indian => "印度人",
            Race::Black => "黑人",
            Race::White => "白人",
            Race::MiddleEastern => "中东人",
            Race::LatinoHispanic => "拉丁裔",
        }
    }
}

/// Dominant facial expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Category for Emotion {
    const KIND: CategoryKind = CategoryKind::Emotion;
    const ALL: &'static [Self] = &[
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    fn label(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Emotion::Angry => "愤怒",
            Emotion::Disgust => "厌恶",
            Emotion::Fear => "恐惧",
            Emotion::Happy => "开心",
            Emotion::Sad => "悲伤",
            Emotion::Surprise => "惊讶",
            Emotion::Neutral => "平静",
        }
    }
}

macro_rules! display_via_name {
    ($($category:ty),*) => {
        $(
            impl Display for $category {
                fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                    f.write_str(self.display_name())
                }
            }
        )*
    };
}

display_via_name!(Gender, Race, Emotion);

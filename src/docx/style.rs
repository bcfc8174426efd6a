//! Formatting snapshot of one run (`w:rPr`).

use crate::docx::xml::{escape_attr, find_attr, unescape_attr, XmlEvent};

/// `ST_Underline` values. Anything unrecognized reads as [`UnderlinePattern::None`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnderlinePattern {
    #[default]
    None,
    Single,
    Words,
    Double,
    Thick,
    Dotted,
    DottedHeavy,
    Dash,
    DashedHeavy,
    DashLong,
    DashLongHeavy,
    DotDash,
    DashDotHeavy,
    DotDotDash,
    DashDotDotHeavy,
    Wave,
    WavyHeavy,
    WavyDouble,
}

impl UnderlinePattern {
    const ALL: [(UnderlinePattern, &'static str); 18] = [
        (UnderlinePattern::None, "none"),
        (UnderlinePattern::Single, "single"),
        (UnderlinePattern::Words, "words"),
        (UnderlinePattern::Double, "double"),
        (UnderlinePattern::Thick, "thick"),
        (UnderlinePattern::Dotted, "dotted"),
        (UnderlinePattern::DottedHeavy, "dottedHeavy"),
        (UnderlinePattern::Dash, "dash"),
        (UnderlinePattern::DashedHeavy, "dashedHeavy"),
        (UnderlinePattern::DashLong, "dashLong"),
        (UnderlinePattern::DashLongHeavy, "dashLongHeavy"),
        (UnderlinePattern::DotDash, "dotDash"),
        (UnderlinePattern::DashDotHeavy, "dashDotHeavy"),
        (UnderlinePattern::DotDotDash, "dotDotDash"),
        (UnderlinePattern::DashDotDotHeavy, "dashDotDotHeavy"),
        (UnderlinePattern::Wave, "wave"),
        (UnderlinePattern::WavyHeavy, "wavyHeavy"),
        (UnderlinePattern::WavyDouble, "wavyDouble"),
    ];

    pub fn parse(val: &str) -> Self {
        let val = val.trim();
        Self::ALL
            .iter()
            .find(|(_, s)| *s == val)
            .map(|(p, _)| *p)
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(p, _)| *p == self)
            .map(|(_, s)| *s)
            .unwrap_or("none")
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleDescriptor {
    pub bold: bool,
    pub italic: bool,
    pub underline: UnderlinePattern,
    pub strikethrough: bool,
    pub font_family: Option<String>,
    /// Points. Always strictly positive when present.
    pub font_size: Option<f64>,
    pub color: Option<String>,
}

impl StyleDescriptor {
    /// Reads the direct formatting of a run from its child events (the run's
    /// own `Start`/`End` excluded). Missing or malformed attributes read as
    /// their defaults.
    pub fn from_run_events(run_children: &[XmlEvent]) -> Self {
        let mut style = StyleDescriptor::default();
        let mut depth = 0usize;
        let mut in_rpr = false;
        for ev in run_children {
            match ev {
                XmlEvent::Start { name, attrs } => {
                    if depth == 0 && name == "w:rPr" {
                        in_rpr = true;
                    } else if in_rpr && depth == 1 {
                        style.apply_property(name, attrs);
                    }
                    depth += 1;
                }
                XmlEvent::Empty { name, attrs } => {
                    if in_rpr && depth == 1 {
                        style.apply_property(name, attrs);
                    }
                }
                XmlEvent::End { name } => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && name == "w:rPr" {
                        in_rpr = false;
                    }
                }
                _ => {}
            }
        }
        style
    }

    fn apply_property(&mut self, name: &str, attrs: &[(String, String)]) {
        match name {
            "w:b" => self.bold = parse_w_bool(attrs),
            "w:i" => self.italic = parse_w_bool(attrs),
            "w:strike" => self.strikethrough = parse_w_bool(attrs),
            "w:u" => {
                self.underline = find_attr(attrs, "w:val")
                    .map(UnderlinePattern::parse)
                    .unwrap_or_default()
            }
            "w:color" => self.color = find_attr(attrs, "w:val").map(unescape_attr),
            "w:sz" => self.font_size = find_attr(attrs, "w:val").and_then(parse_half_points),
            "w:rFonts" => {
                self.font_family = find_attr(attrs, "w:ascii")
                    .or_else(|| find_attr(attrs, "w:hAnsi"))
                    .map(unescape_attr)
                    .filter(|f| !f.trim().is_empty())
            }
            _ => {}
        }
    }

    /// Fresh `w:rPr` for a newly created run.
    pub fn to_rpr_events(&self) -> Vec<XmlEvent> {
        let mut out = vec![XmlEvent::start("w:rPr", Vec::new())];
        if let Some(font) = self.font_family.as_deref() {
            let font = escape_attr(font);
            out.push(XmlEvent::empty(
                "w:rFonts",
                ["w:ascii", "w:hAnsi", "w:eastAsia", "w:cs"]
                    .iter()
                    .map(|k| (k.to_string(), font.clone()))
                    .collect(),
            ));
        }
        out.push(bool_property("w:b", self.bold));
        out.push(bool_property("w:i", self.italic));
        out.push(bool_property("w:strike", self.strikethrough));
        if let Some(color) = self.color.as_deref() {
            out.push(val_property("w:color", &escape_attr(color)));
        }
        if let Some(half) = self.font_size.and_then(to_half_points) {
            out.push(val_property("w:sz", &half.to_string()));
            out.push(val_property("w:szCs", &half.to_string()));
        }
        out.push(val_property("w:u", self.underline.as_str()));
        out.push(XmlEvent::end("w:rPr"));
        out
    }
}

fn bool_property(name: &str, on: bool) -> XmlEvent {
    if on {
        XmlEvent::empty(name, Vec::new())
    } else {
        val_property(name, "0")
    }
}

fn val_property(name: &str, val: &str) -> XmlEvent {
    XmlEvent::empty(name, vec![("w:val".to_string(), val.to_string())])
}

fn parse_w_bool(attrs: &[(String, String)]) -> bool {
    if let Some(v) = find_attr(attrs, "w:val") {
        let s = v.trim().to_ascii_lowercase();
        return !(s == "0" || s == "false" || s == "off" || s == "none");
    }
    true
}

fn parse_half_points(val: &str) -> Option<f64> {
    let half: f64 = val.trim().parse().ok()?;
    let pt = half / 2.0;
    (pt.is_finite() && pt > 0.0).then_some(pt)
}

fn to_half_points(pt: f64) -> Option<u32> {
    if !pt.is_finite() || pt <= 0.0 {
        return None;
    }
    Some(((pt * 2.0).round() as u32).max(1))
}

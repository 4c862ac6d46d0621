use pagecraft_model::Element;

/// Holds at most one copied element.
///
/// Copying several elements keeps only the first one.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    element: Option<Element>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, element: &Element) {
        self.element = Some(element.clone());
    }

    pub fn peek(&self) -> Option<&Element> {
        self.element.as_ref()
    }

    pub fn clear(&mut self) {
        self.element = None;
    }

    pub fn is_empty(&self) -> bool {
        self.element.is_none()
    }
}

use ustva_derive::Validate;

#[derive(Validate)]
#[validate(non_empty, no_control_chars)]
pub struct Contact {
    pub name: String,
    pub street: String,
}

fn main() {
    assert!(Contact::new("Erika Mustermann".into(), "Hauptstr. 1".into()).is_ok());
    assert!(Contact::new("  ".into(), "Hauptstr. 1".into()).is_err());
    assert!(Contact::new("Erika\tMustermann".into(), "Hauptstr. 1".into()).is_err());
}

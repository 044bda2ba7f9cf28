mod note_form;
mod notes;
mod skills;

pub use note_form::NoteFormView;
pub use notes::NotesView;
pub use skills::SkillsView;

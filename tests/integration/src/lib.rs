//! Shared helpers for the odim integration tests

use odim::db::{Manager, Odim, Result};
use odim_test::fixtures::{Person, Ticket};

/// Save Ann (31), Bob (17) and Cy (45), in that order
pub async fn seed_people(odim: &Odim) -> Result<Vec<Person>> {
	let people = odim.objects::<Person>()?;
	let mut saved = Vec::new();
	for mut person in [
		Person::new("Ann", 31).with_email("ann@example.com"),
		Person::new("bob", 17),
		Person::new("Cy", 45).with_email("cy@example.org"),
	] {
		people.bind(&mut person).save().await?;
		saved.push(person);
	}
	Ok(saved)
}

/// Save three tickets; only the first is assigned
pub async fn seed_tickets(odim: &Odim) -> Result<Vec<Ticket>> {
	let tickets = odim.objects::<Ticket>()?;
	let mut saved = Vec::new();
	for mut ticket in [
		Ticket::new("Login page crashes", 3)
			.with_labels(&["bug", "auth"])
			.assigned_to("ann"),
		Ticket::new("Add dark mode", 1).with_labels(&["feature"]),
		Ticket::new("Crash on logout", 5),
	] {
		tickets.bind(&mut ticket).save().await?;
		saved.push(ticket);
	}
	Ok(saved)
}

/// Names of `people`, in order
pub fn names(people: &[Person]) -> Vec<&str> {
	people.iter().map(|person| person.name.as_str()).collect()
}

/// Titles visible through `manager`, sorted by id
pub async fn ticket_titles(manager: &Manager<Ticket>) -> Result<Vec<String>> {
	let mut tickets = manager.find(&Default::default()).await?;
	tickets.sort_by_key(|ticket| ticket.id);
	Ok(tickets.into_iter().map(|ticket| ticket.title).collect())
}

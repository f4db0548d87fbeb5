mod page_outcomes;

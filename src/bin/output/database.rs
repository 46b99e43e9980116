use sqlite::{Connection, State, Statement};
use std::mem;
use std::path::Path;

use crunch::sim::Simulator;
use output::Output;
use Result;

pub struct Database {
    #[allow(dead_code)]
    connection: Connection,
    statement: Statement<'static>,
}

impl Database {
    pub fn new<T: AsRef<Path>>(simulator: &Simulator, path: T) -> Result<Database> {
        use sql::prelude::*;

        let connection = ok!(Connection::open(path));

        ok!(connection.execute({
            ok!(create_table("trace").if_not_exists().columns(&[
                "time".float().not_null(), "project_id".integer().not_null(),
                "debt".float().not_null(), "in_progress".integer().not_null(),
                "work_request".float().not_null(),
            ]).compile())
        }));

        ok!(connection.execute(ok!(delete_from("trace").compile())));

        let statement = {
            let projects = simulator.state.catalog.projects().len();
            let statement = ok!(connection.prepare({
                ok!(insert_into("trace").columns(&[
                    "time", "project_id", "debt", "in_progress", "work_request",
                ]).batch(projects).compile())
            }));
            unsafe { mem::transmute(statement) }
        };

        Ok(Database { connection: connection, statement: statement })
    }
}

impl Output for Database {
    fn next(&mut self, simulator: &Simulator) -> Result<()> {
        let time = simulator.state.now;
        let statement = &mut self.statement;
        ok!(statement.reset());
        let mut k = 0;
        for project in simulator.state.catalog.projects() {
            ok!(statement.bind((k + 1, time)));
            ok!(statement.bind((k + 2, project.id.0 as i64)));
            ok!(statement.bind((k + 3, project.debt)));
            ok!(statement.bind((k + 4, project.in_progress as i64)));
            ok!(statement.bind((k + 5, project.work_request)));
            k += 5;
        }
        if State::Done != ok!(statement.next()) {
            raise!("failed to write into the database");
        }
        Ok(())
    }
}
